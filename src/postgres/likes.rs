use ::std::collections::HashSet;
use async_trait::async_trait;

use super::PostgresStore;
use crate::{error::ForumResult, store::LikeStore};

#[async_trait]
impl LikeStore for PostgresStore {
    async fn like(&self, openid: &str, post_id: i64) -> ForumResult<bool> {
        let mut transaction = self.pool.begin().await?;

        let inserted = ::sqlx::query(
            "
            INSERT INTO user_likes (openid, post_id)
            VALUES ($1, $2)
            ON CONFLICT (openid, post_id) DO NOTHING
            ",
        )
        .bind(openid)
        .bind(post_id)
        .execute(&mut *transaction)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            ::sqlx::query("UPDATE posts SET likes = likes + 1 WHERE id = $1")
                .bind(post_id)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;

        Ok(inserted)
    }

    async fn unlike(&self, openid: &str, post_id: i64) -> ForumResult<bool> {
        let mut transaction = self.pool.begin().await?;

        let deleted = ::sqlx::query(
            "DELETE FROM user_likes WHERE openid = $1 AND post_id = $2",
        )
        .bind(openid)
        .bind(post_id)
        .execute(&mut *transaction)
        .await?
        .rows_affected()
            > 0;

        if deleted {
            ::sqlx::query(
                "UPDATE posts SET likes = GREATEST(likes - 1, 0) WHERE id = $1",
            )
            .bind(post_id)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        Ok(deleted)
    }

    async fn liked_post_ids(
        &self,
        openid: &str,
        post_ids: &[i64],
    ) -> ForumResult<HashSet<i64>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let query = "
            SELECT post_id
            FROM user_likes
            WHERE openid = $1
            AND post_id = ANY($2)
        ";

        let liked = ::sqlx::query_scalar::<_, i64>(query)
            .bind(openid)
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(liked.into_iter().collect())
    }
}
