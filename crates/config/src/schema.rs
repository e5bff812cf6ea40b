//! Config schema types (pre-classifier hook, reasoning side-channel, sessions, metrics).

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Deadline applied to the pre-classifier hook when `timeout_ms` is unset.
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 5000;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    #[serde(alias = "preClassifier")]
    pub pre_classifier: PreClassifierConfig,
    pub reasoning: ReasoningConfig,
    pub sessions: SessionsConfig,
    pub metrics: MetricsConfig,
}

/// Cheap local classifier consulted before any generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreClassifierConfig {
    pub enabled: bool,
    /// Endpoint receiving `POST` requests with the inbound message.
    pub url: String,
    /// Request deadline in milliseconds. Defaults to 5000.
    #[serde(alias = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// A pre-classifier config that is enabled and has an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPreClassifier {
    pub url: String,
    pub timeout: Duration,
}

impl PreClassifierConfig {
    /// Returns `None` when the hook is disabled or has no URL.
    #[must_use]
    pub fn resolve(&self) -> Option<ResolvedPreClassifier> {
        let url = self.url.trim();
        if !self.enabled || url.is_empty() {
            return None;
        }
        Some(ResolvedPreClassifier {
            url: url.to_string(),
            timeout: Duration::from_millis(
                self.timeout_ms.unwrap_or(DEFAULT_CLASSIFIER_TIMEOUT_MS),
            ),
        })
    }
}

/// Where republished reasoning is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    /// Reply in a thread under the triggering message.
    #[default]
    Thread,
    /// Post to a standing channel (`channel_id`).
    Channel,
}

/// Republishing of an agent turn's private deliberation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub enabled: bool,
    pub mode: ReasoningMode,
    /// Channel provider used for delivery (e.g. "mattermost").
    pub provider: String,
    #[serde(alias = "accountId", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Target channel for [`ReasoningMode::Channel`].
    #[serde(alias = "channelId", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// Session transcript storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Directory holding `<session_key>.jsonl` transcripts.
    /// Defaults to `<data_dir>/sessions`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl SessionsConfig {
    /// Configured transcript directory, or the default under the data dir.
    #[must_use]
    pub fn resolve_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.clone(),
            None => crate::loader::data_dir().join("sessions"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}
