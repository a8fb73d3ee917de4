use ::envconfig::Envconfig;
use ::log::*;
use ::std::sync::Arc;
use ::warp::Filter;

mod comments;
mod config;
mod context;
mod error;
mod handlers;
mod likes;
mod model;
mod moderation;
mod postgres;
mod posts;
mod storage;
mod store;
mod utils;

#[cfg(test)]
mod test_utils;

use crate::{
    comments::CommentService,
    likes::LikeService,
    moderation::{
        aggregator::PostAggregator, callback::CallbackReceiver,
        providers::interface::ContentSafetyProvider,
    },
    posts::PostService,
    storage::interface::StorageResolver,
    store::{
        CategoryStore, CommentStore, ImageCheckStore, LikeStore, PostStore,
    },
};

const MAX_BODY_BYTES: u64 = 1024 * 64;

pub(crate) struct State {
    pool: ::sqlx::PgPool,
    posts: PostService,
    comments: CommentService,
    likes: LikeService,
    callbacks: CallbackReceiver,
    statsd_client: ::cadence::StatsdClient,
}

impl State {
    fn new<S>(
        pool: ::sqlx::PgPool,
        store: Arc<S>,
        moderation: Arc<dyn ContentSafetyProvider>,
        storage: Arc<dyn StorageResolver>,
        statsd_client: ::cadence::StatsdClient,
    ) -> Self
    where
        S: PostStore
            + ImageCheckStore
            + CategoryStore
            + CommentStore
            + LikeStore
            + 'static,
    {
        let aggregator =
            Arc::new(PostAggregator::new(store.clone(), store.clone()));

        State {
            pool,
            posts: PostService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                moderation.clone(),
                storage,
            ),
            comments: CommentService::new(
                store.clone(),
                store.clone(),
                moderation,
            ),
            likes: LikeService::new(store.clone(), store.clone()),
            callbacks: CallbackReceiver::new(store, aggregator),
            statsd_client,
        }
    }
}

async fn handle_rejection(
    err: ::warp::Rejection,
) -> Result<impl ::warp::Reply, ::std::convert::Infallible> {
    use ::warp::http::StatusCode;

    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.find::<::warp::reject::InvalidQuery>().is_some() {
        StatusCode::BAD_REQUEST
    } else if err.find::<::warp::reject::PayloadTooLarge>().is_some() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if err.find::<::warp::reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else {
        warn!("rejection {:?}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(::warp::reply::with_status(
        status.canonical_reason().unwrap_or("").to_string(),
        status,
    ))
}

fn routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl ::warp::Reply,), Error = ::std::convert::Infallible>
       + Clone {
    let cors = ::warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(&[
            ::warp::http::Method::POST,
            ::warp::http::Method::GET,
            ::warp::http::Method::DELETE,
        ]);

    let state_filter = ::warp::any().map(move || state.clone());

    let health_route = ::warp::get()
        .and(::warp::path("health"))
        .and(::warp::path::end())
        .and(state_filter.clone())
        .and_then(crate::handlers::get_health::handler);

    let create_post_route = ::warp::post()
        .and(::warp::path!("api" / "posts"))
        .and(state_filter.clone())
        .and(crate::context::with_context())
        .and(::warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(::warp::body::bytes())
        .and_then(crate::handlers::post_posts::handler)
        .with(cors.clone());

    let list_posts_route = ::warp::get()
        .and(::warp::path!("api" / "posts"))
        .and(state_filter.clone())
        .and(crate::context::with_context())
        .and(::warp::query::<crate::handlers::get_posts::Query>())
        .and_then(crate::handlers::get_posts::handler)
        .with(cors.clone());

    let get_post_route = ::warp::get()
        .and(::warp::path!("api" / "posts" / i64))
        .and(state_filter.clone())
        .and(crate::context::with_context())
        .and_then(crate::handlers::get_post::handler)
        .with(cors.clone());

    let delete_post_route = ::warp::delete()
        .and(::warp::path!("api" / "posts" / i64))
        .and(state_filter.clone())
        .and(crate::context::with_context())
        .and_then(crate::handlers::delete_post::handler)
        .with(cors.clone());

    let create_comment_route = ::warp::post()
        .and(::warp::path!("api" / "posts" / i64 / "comments"))
        .and(state_filter.clone())
        .and(crate::context::with_context())
        .and(::warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(::warp::body::bytes())
        .and_then(crate::handlers::post_comments::handler)
        .with(cors.clone());

    let list_comments_route = ::warp::get()
        .and(::warp::path!("api" / "posts" / i64 / "comments"))
        .and(state_filter.clone())
        .and_then(crate::handlers::get_comments::handler)
        .with(cors.clone());

    let like_route = ::warp::post()
        .and(::warp::path!("api" / "posts" / i64 / "like"))
        .and(state_filter.clone())
        .and(crate::context::with_context())
        .and(::warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(::warp::body::bytes())
        .and_then(crate::handlers::post_like::handler)
        .with(cors.clone());

    let categories_route = ::warp::get()
        .and(::warp::path!("api" / "categories"))
        .and(state_filter.clone())
        .and_then(crate::handlers::get_categories::handler)
        .with(cors.clone());

    let media_check_callback_route = ::warp::post()
        .and(::warp::path!("api" / "wechat" / "media-check"))
        .and(state_filter.clone())
        .and(::warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(::warp::body::bytes())
        .and_then(crate::handlers::post_media_check_callback::handler);

    health_route
        .or(create_post_route)
        .or(list_posts_route)
        .or(get_post_route)
        .or(delete_post_route)
        .or(create_comment_route)
        .or(list_comments_route)
        .or(like_route)
        .or(categories_route)
        .or(media_check_callback_route)
        .recover(handle_rejection)
}

async fn connect_postgres(
    config: &crate::config::Config,
) -> ::anyhow::Result<::sqlx::PgPool> {
    let options = ::sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.postgres_max_connections);

    let op = || {
        let options = options.clone();
        let url = config.postgres_string.clone();

        async move {
            options.connect(&url).await.map_err(|err| {
                warn!("Postgres not ready: {}", err);
                ::backoff::Error::transient(err)
            })
        }
    };

    let backoff = ::backoff::ExponentialBackoff {
        max_elapsed_time: Some(::std::time::Duration::from_secs(120)),
        ..Default::default()
    };

    Ok(::backoff::future::retry(backoff, op).await?)
}

fn make_statsd_client(
    config: &crate::config::Config,
) -> ::anyhow::Result<::cadence::StatsdClient> {
    let socket = ::std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.set_nonblocking(true)?;

    let sink = ::cadence::UdpMetricSink::from(
        (config.statsd_address.as_str(), config.statsd_port),
        socket,
    )?;

    Ok(::cadence::StatsdClient::from_sink(
        "wxforum",
        ::cadence::QueuingMetricSink::from(sink),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn ::std::error::Error>> {
    ::env_logger::init();

    let config = crate::config::Config::init_from_env()?;

    info!("Connecting to Postgres");
    let pool = connect_postgres(&config).await?;

    let mut transaction = pool.begin().await?;
    crate::postgres::prepare_database(&mut transaction).await?;
    transaction.commit().await?;

    info!("Moderation interface: {}", config.moderation_interface);
    let moderation: Arc<dyn ContentSafetyProvider> =
        Arc::from(crate::moderation::providers::make_provider(&config)?);

    info!("Storage interface: {}", config.storage_interface);
    let storage: Arc<dyn StorageResolver> =
        Arc::from(crate::storage::make_resolver(&config)?);

    let statsd_client = make_statsd_client(&config)?;

    let state = Arc::new(State::new(
        pool.clone(),
        Arc::new(crate::postgres::PostgresStore::new(pool)),
        moderation,
        storage,
        statsd_client,
    ));

    info!("Listening on {}", config.http_port_api);
    ::warp::serve(routes(state))
        .run(([0, 0, 0, 0], config.http_port_api))
        .await;

    Ok(())
}
