use std::{path::PathBuf, sync::Arc};

use {
    courier_channels::{OutboundMessage, OutboundRegistry},
    courier_config::{ReasoningConfig, ReasoningMode},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{counter, labels, reasoning as reasoning_metrics};

use crate::{
    error::{Context, Result},
    reasoning::extract::extract_last_reasoning,
};

/// Longest deliberation text republished, in characters.
pub const MAX_REASONING_CHARS: usize = 4000;

/// Appended when deliberation text was cut at [`MAX_REASONING_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n\n[truncated]";

/// Cap `text` at [`MAX_REASONING_CHARS`] characters, marking any cut.
pub fn truncate_reasoning(text: &str) -> String {
    match text.char_indices().nth(MAX_REASONING_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn format_thread_reasoning(text: &str) -> String {
    format!("🧠 **Thinking:**\n```\n{}\n```", truncate_reasoning(text))
}

pub fn format_channel_reasoning(text: &str, session_key: Option<&str>) -> String {
    format!(
        "🧠 **Thinking** ({}):\n```\n{}\n```",
        session_key.unwrap_or("unknown session"),
        truncate_reasoning(text)
    )
}

/// The message a thread reply attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext {
    pub channel_id: String,
    pub message_id: String,
}

/// Where the turn that produced the reasoning came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningTarget {
    pub session_key: Option<String>,
    pub thread: Option<ThreadContext>,
}

/// Republishes deliberation text through the configured provider's transport.
///
/// Publishing is best-effort: every failure is logged and dropped.
#[derive(Clone)]
pub struct ReasoningPublisher {
    config: Arc<ReasoningConfig>,
    transports: Arc<OutboundRegistry>,
}

impl ReasoningPublisher {
    pub fn new(config: ReasoningConfig, transports: OutboundRegistry) -> Self {
        Self {
            config: Arc::new(config),
            transports: Arc::new(transports),
        }
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Publish `text` for `target`. Never fails.
    pub async fn publish(&self, text: &str, target: &ReasoningTarget) {
        match self.try_publish(text, target).await {
            Ok(true) => {
                #[cfg(feature = "metrics")]
                counter!(
                    reasoning_metrics::PUBLISHED_TOTAL,
                    labels::MODE => mode_label(self.config.mode),
                    labels::PROVIDER => self.config.provider.clone()
                )
                .increment(1);
            },
            Ok(false) => {},
            Err(e) => {
                warn!(
                    provider = %self.config.provider,
                    mode = mode_label(self.config.mode),
                    error = %e,
                    "failed to publish reasoning"
                );
                #[cfg(feature = "metrics")]
                counter!(
                    reasoning_metrics::PUBLISH_FAILURES_TOTAL,
                    labels::MODE => mode_label(self.config.mode),
                    labels::PROVIDER => self.config.provider.clone()
                )
                .increment(1);
            },
        }
    }

    /// Publish `text`, returning whether anything was sent.
    ///
    /// Missing prerequisites (disabled, no thread, no channel) are a silent
    /// skip, not an error.
    pub async fn try_publish(&self, text: &str, target: &ReasoningTarget) -> Result<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        let message = match self.config.mode {
            ReasoningMode::Thread => {
                let Some(thread) = &target.thread else {
                    debug!("no triggering message to thread reasoning under, skipping");
                    return Ok(false);
                };
                OutboundMessage {
                    channel: self.config.provider.clone(),
                    account_id: self.config.account_id.clone(),
                    to: thread.channel_id.clone(),
                    content: format_thread_reasoning(text),
                    reply_to_id: Some(thread.message_id.clone()),
                }
            },
            ReasoningMode::Channel => {
                let Some(channel_id) = self
                    .config
                    .channel_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                else {
                    debug!("no reasoning channel configured, skipping");
                    return Ok(false);
                };
                OutboundMessage {
                    channel: self.config.provider.clone(),
                    account_id: self.config.account_id.clone(),
                    to: channel_id.to_string(),
                    content: format_channel_reasoning(text, target.session_key.as_deref()),
                    reply_to_id: None,
                }
            },
        };

        let provider = self.config.provider.trim();
        if provider.is_empty() {
            return Err(crate::Error::message("reasoning provider is not configured"));
        }
        if self.transports.get(provider).is_none() {
            debug!(provider, "no transport registered for reasoning provider, skipping");
            return Ok(false);
        }

        #[cfg(feature = "metrics")]
        if text.chars().count() > MAX_REASONING_CHARS {
            counter!(reasoning_metrics::TRUNCATED_TOTAL).increment(1);
        }

        self.transports
            .send(&message)
            .await
            .with_context(|| format!("sending reasoning via {provider}"))?;
        debug!(
            provider,
            mode = mode_label(self.config.mode),
            "reasoning published"
        );
        Ok(true)
    }

    /// Extract the last agent turn's deliberation from `transcript` and
    /// publish it. A transcript without deliberation publishes nothing.
    pub async fn publish_from_transcript(&self, transcript: PathBuf, target: ReasoningTarget) {
        if !self.config.enabled {
            return;
        }
        match extract_last_reasoning(&transcript).await {
            Some(text) => self.publish(&text, &target).await,
            None => debug!(
                path = %transcript.display(),
                "no reasoning in latest agent turn"
            ),
        }
    }
}

fn mode_label(mode: ReasoningMode) -> &'static str {
    match mode {
        ReasoningMode::Thread => "thread",
        ReasoningMode::Channel => "channel",
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        courier_channels::{ChannelOutbound, Result as ChannelResult},
        std::sync::Mutex,
    };

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, String, String, Option<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl ChannelOutbound for Recording {
        async fn send_text(
            &self,
            account_id: &str,
            to: &str,
            text: &str,
            reply_to: Option<&str>,
        ) -> ChannelResult<()> {
            if self.fail {
                return Err(courier_channels::Error::invalid_input("transport down"));
            }
            self.sent.lock().unwrap().push((
                account_id.into(),
                to.into(),
                text.into(),
                reply_to.map(Into::into),
            ));
            Ok(())
        }
    }

    fn publisher(config: ReasoningConfig, outbound: Arc<Recording>) -> ReasoningPublisher {
        let mut transports = OutboundRegistry::new();
        transports.register("mattermost", outbound);
        ReasoningPublisher::new(config, transports)
    }

    fn thread_config() -> ReasoningConfig {
        ReasoningConfig {
            enabled: true,
            mode: ReasoningMode::Thread,
            provider: "mattermost".into(),
            account_id: Some("bot".into()),
            channel_id: None,
        }
    }

    fn channel_config() -> ReasoningConfig {
        ReasoningConfig {
            mode: ReasoningMode::Channel,
            channel_id: Some("town-square".into()),
            ..thread_config()
        }
    }

    fn target() -> ReasoningTarget {
        ReasoningTarget {
            session_key: Some("mattermost:bot:c1".into()),
            thread: Some(ThreadContext {
                channel_id: "c1".into(),
                message_id: "m1".into(),
            }),
        }
    }

    #[test]
    fn truncates_to_limit_with_marker() {
        let text = "a".repeat(5000);
        let out = truncate_reasoning(&text);
        assert_eq!(out, format!("{}\n\n[truncated]", "a".repeat(4000)));
    }

    #[test]
    fn truncation_counts_characters() {
        let text = "é".repeat(4001);
        let out = truncate_reasoning(&text);
        assert!(out.starts_with(&"é".repeat(4000)));
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncate_reasoning(&"é".repeat(4000)), "é".repeat(4000));
    }

    #[test]
    fn templates() {
        assert_eq!(
            format_thread_reasoning("plan"),
            "🧠 **Thinking:**\n```\nplan\n```"
        );
        assert_eq!(
            format_channel_reasoning("plan", None),
            "🧠 **Thinking** (unknown session):\n```\nplan\n```"
        );
    }

    #[tokio::test]
    async fn thread_mode_replies_under_trigger() {
        let outbound = Arc::new(Recording::default());
        let publisher = publisher(thread_config(), outbound.clone());

        publisher.publish("plan", &target()).await;

        let sent = outbound.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "bot");
        assert_eq!(sent[0].1, "c1");
        assert_eq!(sent[0].2, format_thread_reasoning("plan"));
        assert_eq!(sent[0].3.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn channel_mode_broadcasts() {
        let outbound = Arc::new(Recording::default());
        let publisher = publisher(channel_config(), outbound.clone());

        publisher.publish("plan", &target()).await;

        let sent = outbound.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "town-square");
        assert!(sent[0].2.contains("(mattermost:bot:c1)"));
        assert_eq!(sent[0].3, None);
    }

    #[tokio::test]
    async fn publishes_truncated_text() {
        let outbound = Arc::new(Recording::default());
        let publisher = publisher(thread_config(), outbound.clone());

        publisher.publish(&"x".repeat(5000), &target()).await;

        let sent = outbound.sent.lock().unwrap();
        let expected = format!("{}{TRUNCATION_MARKER}", "x".repeat(4000));
        assert_eq!(sent[0].2, format!("🧠 **Thinking:**\n```\n{expected}\n```"));
    }

    #[tokio::test]
    async fn disabled_sends_nothing() {
        let outbound = Arc::new(Recording::default());
        let publisher = publisher(
            ReasoningConfig {
                enabled: false,
                ..thread_config()
            },
            outbound.clone(),
        );

        assert!(!publisher.try_publish("plan", &target()).await.unwrap());
        assert!(outbound.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn thread_mode_without_trigger_skips() {
        let outbound = Arc::new(Recording::default());
        let publisher = publisher(thread_config(), outbound.clone());

        let sent = publisher
            .try_publish("plan", &ReasoningTarget::default())
            .await
            .unwrap();
        assert!(!sent);
    }

    #[tokio::test]
    async fn channel_mode_without_channel_skips() {
        let outbound = Arc::new(Recording::default());
        let publisher = publisher(
            ReasoningConfig {
                channel_id: None,
                ..channel_config()
            },
            outbound.clone(),
        );

        assert!(!publisher.try_publish("plan", &target()).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_provider_skips() {
        let outbound = Arc::new(Recording::default());
        let publisher = publisher(
            ReasoningConfig {
                provider: "slack".into(),
                ..thread_config()
            },
            outbound.clone(),
        );

        assert!(!publisher.try_publish("plan", &target()).await.unwrap());
        assert!(outbound.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fallback_transport_serves_other_providers() {
        let outbound = Arc::new(Recording::default());
        let publisher = ReasoningPublisher::new(
            ReasoningConfig {
                provider: "slack".into(),
                ..thread_config()
            },
            OutboundRegistry::new().with_fallback(outbound.clone()),
        );

        assert!(publisher.try_publish("plan", &target()).await.unwrap());
        assert_eq!(outbound.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let outbound = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let publisher = publisher(thread_config(), outbound);

        assert!(publisher.try_publish("plan", &target()).await.is_err());
        // `publish` must return normally.
        publisher.publish("plan", &target()).await;
    }

    #[tokio::test]
    async fn publishes_from_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        std::fs::write(&path, "{\"role\":\"assistant\",\"reasoning\":\"X\"}\n").unwrap();

        let outbound = Arc::new(Recording::default());
        let publisher = publisher(thread_config(), outbound.clone());

        publisher.publish_from_transcript(path, target()).await;

        let sent = outbound.sent.lock().unwrap();
        assert_eq!(sent[0].2, format_thread_reasoning("X"));
    }
}
