//! Narrow repository interfaces consumed by the moderation pipeline and the
//! post and comment flows. `crate::postgres::PostgresStore` implements all of
//! them.

use ::std::collections::HashSet;
use async_trait::async_trait;

use crate::{
    error::ForumResult,
    model::{
        Category, CheckResolution, Comment, ImageCheckRecord, NewComment,
        NewImageCheck, NewPost, Post, PostCheckStatus, PostListQuery,
    },
};

#[async_trait]
pub(crate) trait ImageCheckStore: Send + Sync {
    /// Inserts with status `Checking`. A reused trace id is
    /// `ForumError::DuplicateTraceId`.
    async fn create(
        &self,
        record: &NewImageCheck,
    ) -> ForumResult<ImageCheckRecord>;

    /// `ForumError::NotFound` when no record carries `trace_id`.
    async fn get_by_trace_id(
        &self,
        trace_id: &str,
    ) -> ForumResult<ImageCheckRecord>;

    /// Overwrites the provider fields. Redelivery writes the same values.
    async fn update_status(
        &self,
        trace_id: &str,
        resolution: &CheckResolution,
    ) -> ForumResult<()>;

    async fn list_by_post_id(
        &self,
        post_id: i64,
    ) -> ForumResult<Vec<ImageCheckRecord>>;

    async fn delete_by_post_id(&self, post_id: i64) -> ForumResult<u64>;
}

#[async_trait]
pub(crate) trait PostStore: Send + Sync {
    async fn create(&self, post: &NewPost) -> ForumResult<i64>;

    /// Non-deleted post, or `ForumError::NotFound`.
    async fn get_by_id(&self, post_id: i64) -> ForumResult<Post>;

    /// Moves a post out of `Checking`. Returns false, without writing, when
    /// the post is not currently `Checking`.
    async fn update_image_check_status(
        &self,
        post_id: i64,
        status: PostCheckStatus,
    ) -> ForumResult<bool>;

    /// Public, non-deleted posts eligible for listing, with the total count
    /// matching the same filter.
    async fn list_listable(
        &self,
        query: &PostListQuery,
    ) -> ForumResult<(Vec<Post>, i64)>;

    async fn increment_views(&self, post_id: i64) -> ForumResult<()>;

    async fn increment_comments(&self, post_id: i64) -> ForumResult<()>;

    async fn soft_delete(&self, post_id: i64) -> ForumResult<()>;

    /// Hard delete, used to discard a post whose creation was aborted.
    async fn delete(&self, post_id: i64) -> ForumResult<()>;
}

#[async_trait]
pub(crate) trait CategoryStore: Send + Sync {
    async fn get_by_code(&self, code: &str) -> ForumResult<Option<Category>>;

    async fn list_active(&self) -> ForumResult<Vec<Category>>;

    async fn increment_post_count(&self, code: &str) -> ForumResult<()>;
}

#[async_trait]
pub(crate) trait CommentStore: Send + Sync {
    async fn create(&self, comment: &NewComment) -> ForumResult<Comment>;

    async fn get_by_id(&self, comment_id: i64) -> ForumResult<Option<Comment>>;

    async fn list_by_post_id(&self, post_id: i64) -> ForumResult<Vec<Comment>>;
}

/// One like per user and post. The post's `likes` counter moves together
/// with the like rows.
#[async_trait]
pub(crate) trait LikeStore: Send + Sync {
    /// Returns false when the user already liked the post.
    async fn like(&self, openid: &str, post_id: i64) -> ForumResult<bool>;

    /// Returns false when there was no like to remove.
    async fn unlike(&self, openid: &str, post_id: i64) -> ForumResult<bool>;

    /// The subset of `post_ids` the user has liked.
    async fn liked_post_ids(
        &self,
        openid: &str,
        post_ids: &[i64],
    ) -> ForumResult<HashSet<i64>>;
}
