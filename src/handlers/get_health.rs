use ::std::time::Duration;
use ::warp::{http::StatusCode, reply::Response, Reply};

const DATABASE_TIMEOUT: Duration = Duration::from_secs(2);

async fn database_reachable(pool: &::sqlx::PgPool) -> bool {
    let ping = ::sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool);

    matches!(::tokio::time::timeout(DATABASE_TIMEOUT, ping).await, Ok(Ok(_)))
}

/// `{"db": bool, "status": "ok" | "degraded"}`, with 503 while Postgres
/// does not answer.
pub(crate) async fn handler(
    state: ::std::sync::Arc<crate::State>,
) -> Result<Response, ::std::convert::Infallible> {
    let db = database_reachable(&state.pool).await;

    let (status, label) = if db {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    Ok(::warp::reply::with_status(
        ::warp::reply::json(&::serde_json::json!({
            "db": db,
            "status": label,
        })),
        status,
    )
    .into_response())
}
