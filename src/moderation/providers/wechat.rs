use super::interface::{
    ContentSafetyProvider, MediaKind, MediaSubmission, RiskLevel, TextVerdict,
};

use crate::{
    error::{ForumError, ForumResult},
    model::{label, Scene, Suggest},
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: u8 = 2;

#[derive(Debug, Serialize)]
struct MsgSecCheckRequest<'a> {
    openid: &'a str,
    version: u8,
    scene: u8,
    content: &'a str,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct CheckResult {
    pub suggest: String,
    pub label: i32,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub(crate) struct CheckDetail {
    pub strategy: String,
    pub errcode: i32,
    pub suggest: String,
    pub label: i32,
    pub prob: f64,
    pub level: i32,
    pub keyword: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct MsgSecCheckResponse {
    pub errcode: i32,
    pub errmsg: String,
    pub trace_id: Option<String>,
    pub result: CheckResult,
    pub detail: Vec<CheckDetail>,
}

#[derive(Debug, Serialize)]
struct MediaCheckAsyncRequest<'a> {
    media_url: &'a str,
    media_type: u8,
    version: u8,
    scene: u8,
    openid: &'a str,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct MediaCheckAsyncResponse {
    pub errcode: i32,
    pub errmsg: String,
    pub trace_id: Option<String>,
}

fn risk_level(response: &MsgSecCheckResponse) -> RiskLevel {
    if Suggest::parse(&response.result.suggest) == Some(Suggest::Pass) {
        return RiskLevel::Safe;
    }

    let max_level = response
        .detail
        .iter()
        .map(|detail| detail.level)
        .max()
        .unwrap_or(0);

    match max_level {
        level if level >= 90 => RiskLevel::High,
        level if level >= 60 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

fn keywords(details: &[CheckDetail]) -> Vec<String> {
    details
        .iter()
        .filter(|detail| !detail.keyword.is_empty())
        .map(|detail| detail.keyword.clone())
        .collect()
}

pub(crate) fn text_verdict(
    response: MsgSecCheckResponse,
) -> ForumResult<TextVerdict> {
    if response.errcode != 0 {
        return Err(ForumError::Provider(format!(
            "msg_sec_check errcode {}: {}",
            response.errcode, response.errmsg
        )));
    }

    let risk_level = risk_level(&response);
    let keywords = keywords(&response.detail);

    Ok(TextVerdict {
        safe: Suggest::parse(&response.result.suggest) == Some(Suggest::Pass),
        suggest: response.result.suggest,
        label: response.result.label,
        trace_id: response.trace_id,
        risk_level,
        keywords,
    })
}

pub(crate) fn media_submission(
    response: MediaCheckAsyncResponse,
) -> ForumResult<MediaSubmission> {
    if response.errcode != 0 {
        return Err(ForumError::Provider(format!(
            "media_check_async errcode {}: {}",
            response.errcode, response.errmsg
        )));
    }

    match response.trace_id {
        Some(trace_id) if !trace_id.is_empty() => {
            Ok(MediaSubmission { trace_id })
        }
        _ => Err(ForumError::Provider(String::from(
            "media_check_async accepted the job without a trace_id",
        ))),
    }
}

/// Client for the WeChat mini-program content-security API, reached through
/// the cloud-hosting open API gateway.
pub(crate) struct WeChatContentSafety {
    msg_sec_check_url: ::url::Url,
    media_check_async_url: ::url::Url,
    client: Client,
}

impl WeChatContentSafety {
    pub(crate) fn new(
        api_base: &str,
        timeout: Duration,
    ) -> ::anyhow::Result<Self> {
        Ok(WeChatContentSafety {
            msg_sec_check_url: crate::utils::api_endpoint(
                api_base,
                "wxa/msg_sec_check",
            )?,
            media_check_async_url: crate::utils::api_endpoint(
                api_base,
                "wxa/media_check_async",
            )?,
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl ContentSafetyProvider for WeChatContentSafety {
    async fn check_text(
        &self,
        openid: &str,
        content: &str,
        scene: Scene,
    ) -> ForumResult<TextVerdict> {
        debug!(
            "msg_sec_check: scene={:?}, content_len={}",
            scene,
            content.chars().count()
        );

        let response: MsgSecCheckResponse = self
            .client
            .post(self.msg_sec_check_url.clone())
            .json(&MsgSecCheckRequest {
                openid,
                version: API_VERSION,
                scene: scene.code(),
                content,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let verdict = text_verdict(response)?;

        if verdict.safe {
            debug!("msg_sec_check passed: trace_id={:?}", verdict.trace_id);
        } else {
            warn!(
                "msg_sec_check rejected: suggest={}, label={} ({}), risk={}, keywords={:?}",
                verdict.suggest,
                verdict.label,
                label::description(verdict.label),
                verdict.risk_level.as_str(),
                verdict.keywords,
            );
        }

        Ok(verdict)
    }

    async fn submit_media(
        &self,
        openid: &str,
        media_url: &str,
        kind: MediaKind,
        scene: Scene,
    ) -> ForumResult<MediaSubmission> {
        debug!("media_check_async: kind={:?}, scene={:?}", kind, scene);

        let response: MediaCheckAsyncResponse = self
            .client
            .post(self.media_check_async_url.clone())
            .json(&MediaCheckAsyncRequest {
                media_url,
                media_type: kind as u8,
                version: API_VERSION,
                scene: scene.code(),
                openid,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let submission = media_submission(response)?;

        debug!("media_check_async accepted: trace_id={}", submission.trace_id);

        Ok(submission)
    }
}
