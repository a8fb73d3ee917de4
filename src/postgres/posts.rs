use async_trait::async_trait;

use super::{PostgresStore, NOW_MS};
use crate::{
    error::{ForumError, ForumResult},
    model::{NewPost, Post, PostCheckStatus, PostListQuery, PostSort},
    store::PostStore,
};

const POST_COLUMNS: &str = "
    id, title, content, excerpt, author_openid, category, category_name,
    tags, images, image_check_status, is_public, is_deleted,
    likes, comments, views, shares, created_at_ms, updated_at_ms
";

const LISTABLE_FILTER: &str = "
    is_deleted = FALSE
    AND is_public = TRUE
    AND image_check_status IN ($1, $2)
    AND ($3::TEXT IS NULL OR category = $3)
";

fn order_by(sort: PostSort) -> &'static str {
    match sort {
        PostSort::Latest => "created_at_ms DESC, id DESC",
        PostSort::Hot => "likes DESC, views DESC, created_at_ms DESC, id DESC",
        PostSort::Recommend => {
            "likes DESC, comments DESC, created_at_ms DESC, id DESC"
        }
    }
}

#[async_trait]
impl PostStore for PostgresStore {
    async fn create(&self, post: &NewPost) -> ForumResult<i64> {
        let query = "
            INSERT INTO posts (
                title,
                content,
                excerpt,
                author_openid,
                category,
                category_name,
                tags,
                images,
                image_check_status,
                is_public
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
        ";

        let post_id = ::sqlx::query_scalar::<_, i64>(query)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.excerpt)
            .bind(&post.author_openid)
            .bind(&post.category)
            .bind(&post.category_name)
            .bind(&post.tags)
            .bind(&post.images)
            .bind(post.image_check_status)
            .bind(post.is_public)
            .fetch_one(&self.pool)
            .await?;

        Ok(post_id)
    }

    async fn get_by_id(&self, post_id: i64) -> ForumResult<Post> {
        let query = format!(
            "SELECT {} FROM posts WHERE id = $1 AND is_deleted = FALSE",
            POST_COLUMNS
        );

        ::sqlx::query_as::<_, Post>(&query)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ForumError::NotFound(format!("post {}", post_id)))
    }

    async fn update_image_check_status(
        &self,
        post_id: i64,
        status: PostCheckStatus,
    ) -> ForumResult<bool> {
        let query = format!(
            "
            UPDATE posts
            SET
                image_check_status = $2,
                updated_at_ms = {}
            WHERE id = $1
            AND image_check_status = $3
            ",
            NOW_MS
        );

        let result = ::sqlx::query(&query)
            .bind(post_id)
            .bind(status)
            .bind(PostCheckStatus::Checking)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_listable(
        &self,
        query: &PostListQuery,
    ) -> ForumResult<(Vec<Post>, i64)> {
        let select = format!(
            "
            SELECT {}
            FROM posts
            WHERE {}
            ORDER BY {}
            LIMIT $4 OFFSET $5
            ",
            POST_COLUMNS,
            LISTABLE_FILTER,
            order_by(query.sort)
        );

        let posts = ::sqlx::query_as::<_, Post>(&select)
            .bind(PostCheckStatus::NotRequired)
            .bind(PostCheckStatus::Passed)
            .bind(&query.category)
            .bind(i64::from(query.page_size))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM posts WHERE {}", LISTABLE_FILTER);

        let total = ::sqlx::query_scalar::<_, i64>(&count)
            .bind(PostCheckStatus::NotRequired)
            .bind(PostCheckStatus::Passed)
            .bind(&query.category)
            .fetch_one(&self.pool)
            .await?;

        Ok((posts, total))
    }

    async fn increment_views(&self, post_id: i64) -> ForumResult<()> {
        ::sqlx::query("UPDATE posts SET views = views + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn increment_comments(&self, post_id: i64) -> ForumResult<()> {
        ::sqlx::query("UPDATE posts SET comments = comments + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn soft_delete(&self, post_id: i64) -> ForumResult<()> {
        let query = format!(
            "
            UPDATE posts
            SET
                is_deleted = TRUE,
                updated_at_ms = {}
            WHERE id = $1
            AND is_deleted = FALSE
            ",
            NOW_MS
        );

        let result = ::sqlx::query(&query)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ForumError::NotFound(format!("post {}", post_id)));
        }

        Ok(())
    }

    async fn delete(&self, post_id: i64) -> ForumResult<()> {
        ::sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
