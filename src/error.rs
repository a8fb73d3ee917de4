use ::warp::http::StatusCode;

#[derive(Debug, ::thiserror::Error)]
pub(crate) enum ForumError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The moderation or storage provider failed or refused the request.
    /// Content safety is indeterminate when this is returned.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider judged the content unsafe. The message is user facing.
    #[error("{0}")]
    ContentRejected(String),

    #[error("duplicate trace id: {0}")]
    DuplicateTraceId(String),

    #[error("persistence error: {0}")]
    Persistence(#[source] ::sqlx::Error),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("missing identity")]
    Unauthorized,
}

pub(crate) type ForumResult<T> = ::std::result::Result<T, ForumError>;

impl ForumError {
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            ForumError::Validation(_) => StatusCode::BAD_REQUEST,
            ForumError::NotFound(_) => StatusCode::NOT_FOUND,
            ForumError::Provider(_) => StatusCode::BAD_GATEWAY,
            ForumError::ContentRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ForumError::Forbidden(_) => StatusCode::FORBIDDEN,
            ForumError::Unauthorized => StatusCode::UNAUTHORIZED,
            ForumError::DuplicateTraceId(_) | ForumError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<::sqlx::Error> for ForumError {
    fn from(err: ::sqlx::Error) -> Self {
        match err {
            ::sqlx::Error::RowNotFound => {
                ForumError::NotFound(String::from("row"))
            }
            other => ForumError::Persistence(other),
        }
    }
}

impl From<::reqwest::Error> for ForumError {
    fn from(err: ::reqwest::Error) -> Self {
        if err.is_timeout() {
            ForumError::Provider(format!("request timed out: {}", err))
        } else {
            ForumError::Provider(err.to_string())
        }
    }
}

/// Turn an error into a plain text reply with a 400 status.
#[macro_export]
macro_rules! warp_try_err_400 {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => {
                ::log::warn!("bad request: {}", err);
                return Ok(Box::new(::warp::reply::with_status(
                    err.to_string(),
                    ::warp::http::StatusCode::BAD_REQUEST,
                )));
            }
        }
    };
}

/// Turn an error into a plain text reply with a 500 status.
#[macro_export]
macro_rules! warp_try_err_500 {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => {
                ::log::error!("internal error: {}", err);
                return Ok(Box::new(::warp::reply::with_status(
                    err.to_string(),
                    ::warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                )));
            }
        }
    };
}

/// Turn a `ForumError` into a reply carrying the status of its kind.
#[macro_export]
macro_rules! warp_try_forum {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => {
                let err: $crate::error::ForumError = err;
                let status = err.status_code();
                if status.is_server_error() {
                    ::log::error!("request failed: {}", err);
                } else {
                    ::log::debug!("request refused: {}", err);
                }
                return Ok(Box::new(::warp::reply::with_status(
                    ::warp::reply::json(&::serde_json::json!({
                        "code": status.as_u16(),
                        "message": err.to_string(),
                    })),
                    status,
                )));
            }
        }
    };
}
