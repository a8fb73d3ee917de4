use ::log::{debug, warn};
use ::serde::{Deserialize, Serialize};
use ::std::sync::Arc;

use crate::{
    context::RequestContext,
    error::ForumResult,
    posts::PostView,
    store::{LikeStore, PostStore},
};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LikeAction {
    Like,
    Unlike,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct LikeRequest {
    pub action: LikeAction,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LikeState {
    pub is_liked: bool,
    pub likes_count: i32,
}

pub(crate) struct LikeService {
    likes: Arc<dyn LikeStore>,
    posts: Arc<dyn PostStore>,
}

impl LikeService {
    pub(crate) fn new(
        likes: Arc<dyn LikeStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        LikeService { likes, posts }
    }

    /// Set or clear the caller's like. Repeating an action is a no-op.
    pub(crate) async fn toggle(
        &self,
        context: &RequestContext,
        post_id: i64,
        request: LikeRequest,
    ) -> ForumResult<LikeState> {
        let openid = context.require_openid()?;
        self.posts.get_by_id(post_id).await?;

        let (changed, is_liked) = match request.action {
            LikeAction::Like => (self.likes.like(openid, post_id).await?, true),
            LikeAction::Unlike => {
                (self.likes.unlike(openid, post_id).await?, false)
            }
        };

        debug!(
            "{} {:?} post {} (changed: {})",
            context.masked_openid(),
            request.action,
            post_id,
            changed
        );

        let post = self.posts.get_by_id(post_id).await?;

        Ok(LikeState {
            is_liked,
            likes_count: post.likes,
        })
    }

    /// Fill in `is_liked` for the caller. Anonymous callers like nothing.
    /// A lookup failure leaves every flag false.
    pub(crate) async fn mark_liked(
        &self,
        context: &RequestContext,
        posts: &mut [PostView],
    ) {
        let Some(openid) = context.openid.as_deref() else {
            return;
        };

        let post_ids = posts.iter().map(|post| post.id).collect::<Vec<_>>();

        match self.likes.liked_post_ids(openid, &post_ids).await {
            Ok(liked) => {
                for post in posts.iter_mut() {
                    post.is_liked = liked.contains(&post.id);
                }
            }
            Err(err) => {
                warn!("failed to look up likes: {}", err);
            }
        }
    }
}
