use ::log::{debug, info};
use ::lru::LruCache;
use ::std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
};

use crate::{
    error::{ForumError, ForumResult},
    model::{ImageCheckRecord, PostCheckStatus, RecordStatus},
    store::{ImageCheckStore, PostStore},
};

const LOCK_CAPACITY: usize = 1024;

/// What a post's record set says about the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// The post was never gated on images.
    Ungated,
    /// Some images are still waiting for their callback, or have not been
    /// submitted yet.
    Incomplete { unresolved: usize, total: usize },
    Decided(PostCheckStatus),
}

/// Passed iff every one of the post's `images` has a record and every
/// record passed. One failed image fails the post.
pub(crate) fn decide(records: &[ImageCheckRecord], images: usize) -> Decision {
    let total = images.max(records.len());

    if total == 0 {
        return Decision::Ungated;
    }

    let resolved = records
        .iter()
        .filter(|record| record.status.is_terminal())
        .count();

    if resolved < total {
        return Decision::Incomplete {
            unresolved: total - resolved,
            total,
        };
    }

    if records
        .iter()
        .all(|record| record.status == RecordStatus::Passed)
    {
        Decision::Decided(PostCheckStatus::Passed)
    } else {
        Decision::Decided(PostCheckStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AggregationOutcome {
    Ungated,
    Incomplete,
    /// The post was deleted before its checks resolved.
    Missing,
    /// The post moved from `Checking` to this status.
    Updated(PostCheckStatus),
    /// The post had already left `Checking`. Nothing was written.
    AlreadyDecided(PostCheckStatus),
}

pub(crate) struct PostAggregator {
    records: Arc<dyn ImageCheckStore>,
    posts: Arc<dyn PostStore>,
    locks: Mutex<LruCache<i64, Arc<::tokio::sync::Mutex<()>>>>,
}

impl PostAggregator {
    pub(crate) fn new(
        records: Arc<dyn ImageCheckStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        let capacity = NonZeroUsize::new(LOCK_CAPACITY)
            .unwrap_or(NonZeroUsize::MIN);

        PostAggregator {
            records,
            posts,
            locks: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn post_lock(&self, post_id: i64) -> Arc<::tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        locks
            .get_or_insert(post_id, || Arc::new(::tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Recompute a post's status from its records and write it if every
    /// record is terminal. Safe to call redundantly.
    pub(crate) async fn aggregate(
        &self,
        post_id: i64,
    ) -> ForumResult<AggregationOutcome> {
        let lock = self.post_lock(post_id);
        let _guard = lock.lock().await;

        let post = match self.posts.get_by_id(post_id).await {
            Ok(post) => post,
            Err(ForumError::NotFound(_)) => {
                debug!("post {} is gone, nothing to aggregate", post_id);
                return Ok(AggregationOutcome::Missing);
            }
            Err(err) => return Err(err),
        };

        let records = self.records.list_by_post_id(post_id).await?;

        match decide(&records, post.images.len()) {
            Decision::Ungated => {
                debug!("post {} has no image checks", post_id);
                Ok(AggregationOutcome::Ungated)
            }
            Decision::Incomplete { unresolved, total } => {
                debug!(
                    "post {} waiting on {} of {} image checks",
                    post_id, unresolved, total
                );
                Ok(AggregationOutcome::Incomplete)
            }
            Decision::Decided(status) => {
                if self
                    .posts
                    .update_image_check_status(post_id, status)
                    .await?
                {
                    info!("post {} image check status {:?}", post_id, status);
                    Ok(AggregationOutcome::Updated(status))
                } else {
                    debug!("post {} already decided", post_id);
                    Ok(AggregationOutcome::AlreadyDecided(status))
                }
            }
        }
    }
}
