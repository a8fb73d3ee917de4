use ::warp::Filter;

use crate::error::{ForumError, ForumResult};

/// Caller identity as forwarded by the WeChat cloud-hosting gateway.
///
/// The openid doubles as the author identity and as the per-user credential
/// the content-security provider expects.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RequestContext {
    pub openid: Option<String>,
    pub appid: Option<String>,
    pub unionid: Option<String>,
    pub env: Option<String>,
    pub source: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct GatewayHeaders {
    pub openid: Option<String>,
    pub from_openid: Option<String>,
    pub appid: Option<String>,
    pub from_appid: Option<String>,
    pub unionid: Option<String>,
    pub from_unionid: Option<String>,
    pub env: Option<String>,
    pub source: Option<String>,
    pub forwarded_for: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl RequestContext {
    pub(crate) fn from_headers(headers: GatewayHeaders) -> Self {
        RequestContext {
            openid: non_empty(headers.openid)
                .or_else(|| non_empty(headers.from_openid)),
            appid: non_empty(headers.appid)
                .or_else(|| non_empty(headers.from_appid)),
            unionid: non_empty(headers.unionid)
                .or_else(|| non_empty(headers.from_unionid)),
            env: non_empty(headers.env),
            source: non_empty(headers.source),
            ip: non_empty(headers.forwarded_for),
        }
    }

    pub(crate) fn require_openid(&self) -> ForumResult<&str> {
        self.openid.as_deref().ok_or(ForumError::Unauthorized)
    }

    /// Shortened openid for log lines.
    pub(crate) fn masked_openid(&self) -> String {
        match &self.openid {
            Some(openid) if openid.chars().count() > 6 => {
                let prefix: String = openid.chars().take(6).collect();
                format!("{}***", prefix)
            }
            Some(_) => String::from("***"),
            None => String::from("anonymous"),
        }
    }
}

pub(crate) fn with_context(
) -> impl Filter<Extract = (RequestContext,), Error = ::std::convert::Infallible>
       + Clone {
    ::warp::header::optional::<String>("x-wx-openid")
        .and(::warp::header::optional::<String>("x-wx-from-openid"))
        .and(::warp::header::optional::<String>("x-wx-appid"))
        .and(::warp::header::optional::<String>("x-wx-from-appid"))
        .and(::warp::header::optional::<String>("x-wx-unionid"))
        .and(::warp::header::optional::<String>("x-wx-from-unionid"))
        .and(::warp::header::optional::<String>("x-wx-env"))
        .and(::warp::header::optional::<String>("x-wx-source"))
        .and(::warp::header::optional::<String>("x-original-forwarded-for"))
        .map(
            |openid,
             from_openid,
             appid,
             from_appid,
             unionid,
             from_unionid,
             env,
             source,
             forwarded_for| {
                RequestContext::from_headers(GatewayHeaders {
                    openid,
                    from_openid,
                    appid,
                    from_appid,
                    unionid,
                    from_unionid,
                    env,
                    source,
                    forwarded_for,
                })
            },
        )
        .or(::warp::any().map(RequestContext::default))
        .unify()
}
