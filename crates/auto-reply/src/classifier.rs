//! Pre-classifier gate.
//!
//! A cheap local classifier is consulted over HTTP before any generation call.
//! The gate is fail-open: every failure (bad status, unparsable body, unknown
//! action, deadline expiry, transport error) is logged and collapses to "no
//! opinion", which the orchestrator treats as `PROCESS`.

use std::{fmt, time::Duration};

use {
    async_trait::async_trait,
    courier_common::{FinalizedMsgContext, types::now_ms},
    courier_config::{PreClassifierConfig, ResolvedPreClassifier},
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{counter, histogram, labels, pre_classifier as gate_metrics};

/// What the classifier wants done with a message.
///
/// Values outside the five known actions deserialize to
/// [`ClassifierAction::Unrecognized`] and are never acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClassifierAction {
    Process,
    Stop,
    Simple,
    Wait,
    Append,
    Unrecognized(String),
}

impl ClassifierAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Process => "PROCESS",
            Self::Stop => "STOP",
            Self::Simple => "SIMPLE",
            Self::Wait => "WAIT",
            Self::Append => "APPEND",
            Self::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for ClassifierAction {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PROCESS" => Self::Process,
            "STOP" => Self::Stop,
            "SIMPLE" => Self::Simple,
            "WAIT" => Self::Wait,
            "APPEND" => Self::Append,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<ClassifierAction> for String {
    fn from(action: ClassifierAction) -> Self {
        match action {
            ClassifierAction::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ClassifierAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's verdict for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOpinion {
    pub action: ClassifierAction,
    /// Reply text for [`ClassifierAction::Simple`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ClassifierOpinion {
    pub fn new(action: ClassifierAction) -> Self {
        Self {
            action,
            text: None,
            reason: None,
            confidence: None,
        }
    }
}

/// Source of pre-generation opinions. Returns `None` for "no opinion".
#[async_trait]
pub trait PreClassifier: Send + Sync {
    async fn evaluate(&self, ctx: &FinalizedMsgContext) -> Option<ClassifierOpinion>;
}

/// Request body sent to the classifier hook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifierRequest<'a> {
    message: &'a str,
    sender: &'a str,
    channel: &'a str,
    session_key: &'a str,
    timestamp: u64,
}

/// Why a gate call produced no opinion.
#[derive(Debug)]
enum GateFailure {
    Status(reqwest::StatusCode),
    Timeout(Duration),
    Parse(String),
    InvalidAction(String),
    Transport(String),
}

impl GateFailure {
    fn cause(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Timeout(_) => "timeout",
            Self::Parse(_) => "parse",
            Self::InvalidAction(_) => "invalid_action",
            Self::Transport(_) => "transport",
        }
    }
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "hook returned {status}"),
            Self::Timeout(after) => write!(f, "hook timed out after {}ms", after.as_millis()),
            Self::Parse(e) => write!(f, "hook response did not parse: {e}"),
            Self::InvalidAction(action) => write!(f, "invalid action \"{action}\""),
            Self::Transport(e) => write!(f, "hook failed: {e}"),
        }
    }
}

/// HTTP pre-classifier hook with a per-call deadline.
pub struct ClassifierGate {
    client: reqwest::Client,
    config: Option<ResolvedPreClassifier>,
}

impl ClassifierGate {
    pub fn new(config: &PreClassifierConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &PreClassifierConfig) -> Self {
        Self {
            client,
            config: config.resolve(),
        }
    }

    /// A gate that never calls out.
    pub fn disabled() -> Self {
        Self::new(&PreClassifierConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn request(
        &self,
        url: &str,
        ctx: &FinalizedMsgContext,
    ) -> Result<ClassifierOpinion, GateFailure> {
        let body = ClassifierRequest {
            message: ctx.raw_body(),
            sender: ctx.sender_id(),
            channel: ctx.channel(),
            session_key: ctx.session_key(),
            timestamp: now_ms(),
        };

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GateFailure::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GateFailure::Status(resp.status()));
        }

        let opinion: ClassifierOpinion = resp
            .json()
            .await
            .map_err(|e| GateFailure::Parse(e.to_string()))?;

        if !opinion.action.is_recognized() {
            return Err(GateFailure::InvalidAction(opinion.action.to_string()));
        }
        Ok(opinion)
    }
}

#[async_trait]
impl PreClassifier for ClassifierGate {
    async fn evaluate(&self, ctx: &FinalizedMsgContext) -> Option<ClassifierOpinion> {
        let config = self.config.as_ref()?;

        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        // Dropping the request future on expiry aborts the in-flight call.
        let outcome = match tokio::time::timeout(config.timeout, self.request(&config.url, ctx))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(GateFailure::Timeout(config.timeout)),
        };

        #[cfg(feature = "metrics")]
        histogram!(gate_metrics::DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        match outcome {
            Ok(opinion) => {
                debug!(
                    action = %opinion.action,
                    reason = opinion.reason.as_deref().unwrap_or(""),
                    confidence = ?opinion.confidence,
                    "pre-classifier opinion"
                );
                #[cfg(feature = "metrics")]
                counter!(gate_metrics::OUTCOMES_TOTAL, labels::ACTION => opinion.action.to_string())
                    .increment(1);
                Some(opinion)
            },
            Err(failure) => {
                warn!(
                    cause = failure.cause(),
                    timeout_ms = config.timeout.as_millis() as u64,
                    "pre-classifier {failure}, falling back to PROCESS"
                );
                #[cfg(feature = "metrics")]
                counter!(gate_metrics::FAILURES_TOTAL, labels::CAUSE => failure.cause())
                    .increment(1);
                None
            },
        }
    }
}
