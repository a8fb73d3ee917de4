use ::cadence::Counted;

/// `{"code": 200, "message": "success", "data": ...}` with a 200 status.
pub(crate) fn success<T: ::serde::Serialize>(data: &T) -> Box<dyn ::warp::Reply> {
    Box::new(::warp::reply::json(&::serde_json::json!({
        "code": 200,
        "message": "success",
        "data": data,
    })))
}

pub(crate) fn parse_json<T: ::serde::de::DeserializeOwned>(
    bytes: &::bytes::Bytes,
) -> Result<T, crate::error::ForumError> {
    ::serde_json::from_slice(bytes).map_err(|err| {
        crate::error::ForumError::Validation(format!("request body: {}", err))
    })
}

pub(crate) fn count(state: &crate::State, metric: &str) {
    if let Err(err) = state.statsd_client.count(metric, 1) {
        ::log::warn!("Unable to log {} metric due to: {}", metric, err);
    }
}
