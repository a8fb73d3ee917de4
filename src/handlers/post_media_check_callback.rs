use crate::moderation::callback::{classify, CallbackAck};

/// Webhook for asynchronous media check results. Malformed payloads get a
/// 400 so the provider stops retrying them, processing failures a 500 so it
/// redelivers.
pub(crate) async fn handler(
    state: ::std::sync::Arc<crate::State>,
    bytes: ::bytes::Bytes,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let payload = crate::warp_try_err_400!(classify(&bytes));

    let ack = crate::warp_try_err_500!(state.callbacks.receive(payload).await);

    match ack {
        CallbackAck::Probe => {}
        CallbackAck::Ignored { .. } => {
            super::util::count(&state, "moderation.callbacks.ignored");
        }
        CallbackAck::Processed {
            trace_id,
            post_id,
            status,
            outcome,
        } => {
            ::log::info!(
                "image check {} of post {} resolved {:?}, post {:?}",
                trace_id,
                post_id,
                status,
                outcome
            );
            super::util::count(&state, "moderation.callbacks");
        }
    }

    Ok(Box::new(::warp::reply::with_status(
        "success",
        ::warp::http::StatusCode::OK,
    )))
}
