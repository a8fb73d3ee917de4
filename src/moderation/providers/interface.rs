use async_trait::async_trait;

use crate::{error::ForumResult, model::Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextVerdict {
    pub safe: bool,
    pub suggest: String,
    pub label: i32,
    pub trace_id: Option<String>,
    pub risk_level: RiskLevel,
    pub keywords: Vec<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaKind {
    Audio = 1,
    Image = 2,
}

/// A media job the provider accepted. The verdict arrives later through the
/// callback, keyed by `trace_id`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MediaSubmission {
    pub trace_id: String,
}

#[async_trait]
pub(crate) trait ContentSafetyProvider: Send + Sync {
    /// Synchronous text verdict. A provider error code is an error, not an
    /// unsafe verdict.
    async fn check_text(
        &self,
        openid: &str,
        content: &str,
        scene: Scene,
    ) -> ForumResult<TextVerdict>;

    /// Starts an asynchronous media check. Success only means the job was
    /// accepted.
    async fn submit_media(
        &self,
        openid: &str,
        media_url: &str,
        kind: MediaKind,
        scene: Scene,
    ) -> ForumResult<MediaSubmission>;
}
