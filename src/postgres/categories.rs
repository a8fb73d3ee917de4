use async_trait::async_trait;

use super::PostgresStore;
use crate::{error::ForumResult, model::Category, store::CategoryStore};

#[async_trait]
impl CategoryStore for PostgresStore {
    async fn get_by_code(&self, code: &str) -> ForumResult<Option<Category>> {
        let query = "
            SELECT code, name, icon, description, post_count, sort
            FROM categories
            WHERE code = $1
            AND is_active = TRUE
        ";

        Ok(::sqlx::query_as::<_, Category>(query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_active(&self) -> ForumResult<Vec<Category>> {
        let query = "
            SELECT code, name, icon, description, post_count, sort
            FROM categories
            WHERE is_active = TRUE
            ORDER BY sort, code
        ";

        Ok(::sqlx::query_as::<_, Category>(query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn increment_post_count(&self, code: &str) -> ForumResult<()> {
        ::sqlx::query(
            "UPDATE categories SET post_count = post_count + 1 WHERE code = $1",
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
