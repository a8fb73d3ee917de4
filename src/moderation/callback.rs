use ::log::{debug, info, warn};
use ::serde::Deserialize;
use ::std::{sync::Arc, time::Duration};

use super::{
    aggregator::{AggregationOutcome, PostAggregator},
    providers::wechat::{CheckDetail, CheckResult},
};
use crate::{
    error::{ForumError, ForumResult},
    model::{CheckResolution, ImageCheckRecord, RecordStatus, Suggest},
    store::ImageCheckStore,
};

pub(crate) const MEDIA_CHECK_EVENT: &str = "wxa_media_check";
pub(crate) const PROBE_ACTION: &str = "CheckContainerPath";

/// How long an unknown trace id is looked up again before the callback is
/// dropped. The record is written only after the provider has returned the
/// trace id, so a fast callback can race it.
const LOOKUP_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct ProbePayload {
    action: Option<String>,
}

/// Asynchronous media check result pushed by the provider.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct MediaCheckEvent {
    #[serde(alias = "Event")]
    pub event: String,
    pub appid: String,
    pub trace_id: String,
    pub version: i32,
    pub errcode: i32,
    pub errmsg: String,
    pub result: CheckResult,
    pub detail: Vec<CheckDetail>,
}

#[derive(Debug)]
pub(crate) enum CallbackPayload {
    Probe,
    MediaCheck(MediaCheckEvent),
}

/// Parse a webhook body. Malformed JSON and events other than the media
/// check are `ForumError::Validation`.
pub(crate) fn classify(body: &[u8]) -> ForumResult<CallbackPayload> {
    if let Ok(probe) = ::serde_json::from_slice::<ProbePayload>(body) {
        if probe.action.as_deref() == Some(PROBE_ACTION) {
            return Ok(CallbackPayload::Probe);
        }
    }

    let event: MediaCheckEvent = ::serde_json::from_slice(body)
        .map_err(|err| ForumError::Validation(format!("callback body: {}", err)))?;

    if event.event != MEDIA_CHECK_EVENT {
        return Err(ForumError::Validation(format!(
            "unexpected callback event {:?}",
            event.event
        )));
    }

    Ok(CallbackPayload::MediaCheck(event))
}

/// Map a provider result onto a record. A provider error code fails the
/// image regardless of any verdict fields.
pub(crate) fn resolution(event: &MediaCheckEvent) -> CheckResolution {
    if event.errcode != 0 {
        return CheckResolution {
            status: RecordStatus::Failed,
            suggest: String::from("failed"),
            label: 0,
            prob: 0.0,
            strategy: String::new(),
            errcode: event.errcode,
            errmsg: event.errmsg.clone(),
        };
    }

    let (suggest, label, prob, strategy) = match event.detail.first() {
        Some(detail) => (
            detail.suggest.clone(),
            detail.label,
            detail.prob,
            detail.strategy.clone(),
        ),
        None => (
            event.result.suggest.clone(),
            event.result.label,
            0.0,
            String::new(),
        ),
    };

    CheckResolution {
        status: RecordStatus::from_suggest(&suggest),
        suggest,
        label,
        prob,
        strategy,
        errcode: event.errcode,
        errmsg: event.errmsg.clone(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallbackAck {
    Probe,
    /// No record carries this trace id.
    Ignored { trace_id: String },
    Processed {
        trace_id: String,
        post_id: i64,
        status: RecordStatus,
        outcome: AggregationOutcome,
    },
}

pub(crate) struct CallbackReceiver {
    records: Arc<dyn ImageCheckStore>,
    aggregator: Arc<PostAggregator>,
    lookup_grace: Duration,
}

impl CallbackReceiver {
    pub(crate) fn new(
        records: Arc<dyn ImageCheckStore>,
        aggregator: Arc<PostAggregator>,
    ) -> Self {
        CallbackReceiver {
            records,
            aggregator,
            lookup_grace: LOOKUP_GRACE,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_lookup_grace(mut self, lookup_grace: Duration) -> Self {
        self.lookup_grace = lookup_grace;
        self
    }

    /// The record for `trace_id`, retried with backoff while it is not
    /// found. `None` once the grace period is spent.
    async fn find_record(
        &self,
        trace_id: &str,
    ) -> ForumResult<Option<ImageCheckRecord>> {
        let backoff = ::backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(50))
            .with_max_interval(Duration::from_millis(500))
            .with_max_elapsed_time(Some(self.lookup_grace))
            .build();

        let op = || {
            let records = self.records.clone();
            let trace_id = trace_id.to_string();

            async move {
                records.get_by_trace_id(&trace_id).await.map_err(|err| {
                    match err {
                        ForumError::NotFound(_) => {
                            debug!("no record for trace_id {:?} yet", trace_id);
                            ::backoff::Error::transient(err)
                        }
                        err => ::backoff::Error::permanent(err),
                    }
                })
            }
        };

        match ::backoff::future::retry(backoff, op).await {
            Ok(record) => Ok(Some(record)),
            Err(ForumError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Any error here should be answered with a server error so the
    /// provider redelivers.
    pub(crate) async fn receive(
        &self,
        payload: CallbackPayload,
    ) -> ForumResult<CallbackAck> {
        match payload {
            CallbackPayload::Probe => {
                info!("callback path probe");
                Ok(CallbackAck::Probe)
            }
            CallbackPayload::MediaCheck(event) => self.process(event).await,
        }
    }

    async fn process(&self, event: MediaCheckEvent) -> ForumResult<CallbackAck> {
        debug!(
            "media check callback: trace_id={}, appid={}, version={}, errcode={}, suggest={}, details={}",
            event.trace_id,
            event.appid,
            event.version,
            event.errcode,
            event.result.suggest,
            event.detail.len(),
        );

        let record = match self.find_record(&event.trace_id).await? {
            Some(record) => record,
            None => {
                warn!("callback for unknown trace_id {:?}", event.trace_id);
                return Ok(CallbackAck::Ignored {
                    trace_id: event.trace_id,
                });
            }
        };

        let resolution = resolution(&event);

        debug!(
            "image check {} for post {}: {:?} (suggest={}, label={}, prob={}, strategy={})",
            record.trace_id,
            record.post_id,
            resolution.status,
            Suggest::parse(&resolution.suggest)
                .map(Suggest::description)
                .unwrap_or(resolution.suggest.as_str()),
            resolution.label,
            resolution.prob,
            resolution.strategy,
        );

        self.records
            .update_status(&record.trace_id, &resolution)
            .await?;

        let outcome = self.aggregator.aggregate(record.post_id).await?;

        Ok(CallbackAck::Processed {
            trace_id: record.trace_id,
            post_id: record.post_id,
            status: resolution.status,
            outcome,
        })
    }
}
