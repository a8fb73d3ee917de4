use async_trait::async_trait;

use super::{PostgresStore, NOW_MS};
use crate::{
    error::{ForumError, ForumResult},
    model::{CheckResolution, ImageCheckRecord, NewImageCheck, RecordStatus},
    store::ImageCheckStore,
};

const TRACE_ID_CONSTRAINT: &str = "image_check_records_trace_id_key";

const RECORD_COLUMNS: &str = "
    id, post_id, image_url, trace_id, status, suggest,
    label, prob, strategy, errcode, errmsg
";

fn map_insert_error(err: ::sqlx::Error, trace_id: &str) -> ForumError {
    let duplicate = err
        .as_database_error()
        .map(|db_err| {
            db_err.is_unique_violation()
                && db_err.constraint() == Some(TRACE_ID_CONSTRAINT)
        })
        .unwrap_or(false);

    if duplicate {
        ForumError::DuplicateTraceId(trace_id.to_string())
    } else {
        err.into()
    }
}

#[async_trait]
impl ImageCheckStore for PostgresStore {
    async fn create(
        &self,
        record: &NewImageCheck,
    ) -> ForumResult<ImageCheckRecord> {
        let query = format!(
            "
            INSERT INTO image_check_records (
                post_id,
                image_url,
                trace_id,
                status
            )
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            ",
            RECORD_COLUMNS
        );

        ::sqlx::query_as::<_, ImageCheckRecord>(&query)
            .bind(record.post_id)
            .bind(&record.image_url)
            .bind(&record.trace_id)
            .bind(RecordStatus::Checking)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_insert_error(err, &record.trace_id))
    }

    async fn get_by_trace_id(
        &self,
        trace_id: &str,
    ) -> ForumResult<ImageCheckRecord> {
        let query = format!(
            "SELECT {} FROM image_check_records WHERE trace_id = $1",
            RECORD_COLUMNS
        );

        ::sqlx::query_as::<_, ImageCheckRecord>(&query)
            .bind(trace_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                ForumError::NotFound(format!("image check {}", trace_id))
            })
    }

    async fn update_status(
        &self,
        trace_id: &str,
        resolution: &CheckResolution,
    ) -> ForumResult<()> {
        let query = format!(
            "
            UPDATE image_check_records
            SET
                status = $2,
                suggest = $3,
                label = $4,
                prob = $5,
                strategy = $6,
                errcode = $7,
                errmsg = $8,
                updated_at_ms = {}
            WHERE trace_id = $1
            ",
            NOW_MS
        );

        let result = ::sqlx::query(&query)
            .bind(trace_id)
            .bind(resolution.status)
            .bind(&resolution.suggest)
            .bind(resolution.label)
            .bind(resolution.prob)
            .bind(&resolution.strategy)
            .bind(resolution.errcode)
            .bind(&resolution.errmsg)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ForumError::NotFound(format!(
                "image check {}",
                trace_id
            )));
        }

        Ok(())
    }

    async fn list_by_post_id(
        &self,
        post_id: i64,
    ) -> ForumResult<Vec<ImageCheckRecord>> {
        let query = format!(
            "SELECT {} FROM image_check_records WHERE post_id = $1 ORDER BY id",
            RECORD_COLUMNS
        );

        Ok(::sqlx::query_as::<_, ImageCheckRecord>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn delete_by_post_id(&self, post_id: i64) -> ForumResult<u64> {
        let result =
            ::sqlx::query("DELETE FROM image_check_records WHERE post_id = $1")
                .bind(post_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
