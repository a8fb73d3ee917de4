use async_trait::async_trait;

use super::PostgresStore;
use crate::{
    error::ForumResult,
    model::{Comment, NewComment},
    store::CommentStore,
};

#[async_trait]
impl CommentStore for PostgresStore {
    async fn create(&self, comment: &NewComment) -> ForumResult<Comment> {
        let query = "
            INSERT INTO comments (
                post_id,
                parent_id,
                author_openid,
                content
            )
            VALUES ($1, $2, $3, $4)
            RETURNING
                id, post_id, parent_id, author_openid, content, created_at_ms
        ";

        Ok(::sqlx::query_as::<_, Comment>(query)
            .bind(comment.post_id)
            .bind(comment.parent_id)
            .bind(&comment.author_openid)
            .bind(&comment.content)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_by_id(&self, comment_id: i64) -> ForumResult<Option<Comment>> {
        let query = "
            SELECT id, post_id, parent_id, author_openid, content, created_at_ms
            FROM comments
            WHERE id = $1
        ";

        Ok(::sqlx::query_as::<_, Comment>(query)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_by_post_id(&self, post_id: i64) -> ForumResult<Vec<Comment>> {
        let query = "
            SELECT id, post_id, parent_id, author_openid, content, created_at_ms
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at_ms, id
        ";

        Ok(::sqlx::query_as::<_, Comment>(query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
