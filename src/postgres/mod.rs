use ::sqlx::Executor;

pub(crate) mod categories;
pub(crate) mod comments;
pub(crate) mod image_checks;
pub(crate) mod likes;
pub(crate) mod posts;

const NOW_MS: &str = "(EXTRACT(EPOCH FROM now()) * 1000)::BIGINT";

pub(crate) async fn prepare_database(
    transaction: &mut ::sqlx::Transaction<'_, ::sqlx::Postgres>,
) -> ::sqlx::Result<()> {
    transaction.execute(include_str!("schema.sql")).await?;
    Ok(())
}

/// Every repository trait in `crate::store`, backed by one connection pool.
#[derive(Clone)]
pub(crate) struct PostgresStore {
    pool: ::sqlx::PgPool,
}

impl PostgresStore {
    pub(crate) fn new(pool: ::sqlx::PgPool) -> Self {
        PostgresStore { pool }
    }
}
