//! Dispatch orchestration: pre-classifier gate, then drop, canned reply, or
//! forward to reply generation.

use std::sync::Arc;

use {
    async_trait::async_trait,
    courier_common::FinalizedMsgContext,
    serde::{Deserialize, Serialize},
    tracing::{Instrument, debug, info, info_span, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{auto_reply as auto_reply_metrics, counter, histogram, labels};

use crate::{
    classifier::{ClassifierAction, ClassifierOpinion, PreClassifier},
    reasoning::ReasoningSideChannel,
    reply_dispatcher::{
        ReplyDispatcher, ReplyDispatcherOptions, TypingDispatcherOptions,
        create_reply_dispatcher, create_reply_dispatcher_with_typing,
    },
};

/// Sent for a SIMPLE opinion that carries no text.
pub const SIMPLE_FALLBACK_REPLY: &str = "👍";

/// `skip_reason` of a message dropped by a STOP opinion.
pub const STOP_SKIP_REASON: &str = "pre-classifier-stop";

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub replied: bool,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Set when the pre-classifier answered on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_classified: Option<bool>,
}

impl DispatchResult {
    /// A reply was produced by the generation pipeline.
    #[must_use]
    pub fn delivered() -> Self {
        Self {
            replied: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// A reply was sent straight from the pre-classifier's opinion.
    #[must_use]
    pub fn pre_classified() -> Self {
        Self {
            replied: true,
            pre_classified: Some(true),
            ..Default::default()
        }
    }
}

/// Which way a message goes after the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchBranch {
    /// Drop silently.
    Drop,
    /// Send this text and stop.
    Simple(String),
    /// Hand the message to reply generation.
    Forward,
    /// WAIT or APPEND. Fragment buffering does not exist yet, so these
    /// forward like [`DispatchBranch::Forward`].
    Deferred(ClassifierAction),
}

impl DispatchBranch {
    /// Unrecognized actions and "no opinion" both forward.
    pub fn for_opinion(opinion: Option<&ClassifierOpinion>) -> Self {
        let Some(opinion) = opinion else {
            return Self::Forward;
        };
        match &opinion.action {
            ClassifierAction::Stop => Self::Drop,
            ClassifierAction::Simple => Self::Simple(
                opinion
                    .text
                    .clone()
                    .unwrap_or_else(|| SIMPLE_FALLBACK_REPLY.to_string()),
            ),
            ClassifierAction::Wait | ClassifierAction::Append => {
                Self::Deferred(opinion.action.clone())
            },
            ClassifierAction::Process | ClassifierAction::Unrecognized(_) => Self::Forward,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Simple(_) => "simple",
            Self::Forward => "forward",
            Self::Deferred(_) => "deferred",
        }
    }
}

/// The reply-generation pipeline a forwarded message is handed to.
///
/// Its errors propagate out of the dispatch call unchanged.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(
        &self,
        ctx: &FinalizedMsgContext,
        dispatcher: &dyn ReplyDispatcher,
    ) -> anyhow::Result<DispatchResult>;
}

/// Routes inbound messages through the gate to their terminal action.
#[derive(Clone)]
pub struct InboundDispatcher {
    classifier: Arc<dyn PreClassifier>,
    generator: Arc<dyn ReplyGenerator>,
    reasoning: Option<ReasoningSideChannel>,
}

impl InboundDispatcher {
    pub fn new(classifier: Arc<dyn PreClassifier>, generator: Arc<dyn ReplyGenerator>) -> Self {
        Self {
            classifier,
            generator,
            reasoning: None,
        }
    }

    /// Republish reasoning after every successfully generated turn.
    pub fn with_reasoning(mut self, reasoning: ReasoningSideChannel) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    /// Dispatch one message using a caller-owned dispatcher.
    ///
    /// Only the forward branch can fail, and only with the generator's error.
    pub async fn dispatch(
        &self,
        ctx: impl Into<FinalizedMsgContext>,
        dispatcher: &dyn ReplyDispatcher,
    ) -> anyhow::Result<DispatchResult> {
        let ctx = ctx.into();
        let span = info_span!(
            "auto_reply.dispatch",
            channel = %ctx.channel(),
            session_key = %ctx.session_key(),
        );
        self.run(&ctx, dispatcher).instrument(span).await
    }

    /// Dispatch with a fresh immediate dispatcher, returning once every reply
    /// has been delivered.
    pub async fn dispatch_with_dispatcher(
        &self,
        ctx: impl Into<FinalizedMsgContext>,
        options: ReplyDispatcherOptions,
    ) -> anyhow::Result<DispatchResult> {
        let dispatcher = create_reply_dispatcher(options);
        let result = self.dispatch(ctx, &dispatcher).await;
        dispatcher.wait_for_idle().await;
        result
    }

    /// Dispatch with a typing-bracketed dispatcher. Idle is marked exactly
    /// once after delivery drains, whether or not generation succeeded.
    pub async fn dispatch_with_buffered_dispatcher(
        &self,
        ctx: impl Into<FinalizedMsgContext>,
        options: TypingDispatcherOptions,
    ) -> anyhow::Result<DispatchResult> {
        let (dispatcher, mark_idle) = create_reply_dispatcher_with_typing(options);
        let result = self.dispatch(ctx, &dispatcher).await;
        dispatcher.wait_for_idle().await;
        mark_idle.mark();
        result
    }

    async fn run(
        &self,
        ctx: &FinalizedMsgContext,
        dispatcher: &dyn ReplyDispatcher,
    ) -> anyhow::Result<DispatchResult> {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        #[cfg(feature = "metrics")]
        counter!(
            auto_reply_metrics::MESSAGES_RECEIVED_TOTAL,
            labels::CHANNEL => ctx.channel().to_string()
        )
        .increment(1);

        info!(
            account_id = %ctx.account_id(),
            sender = %ctx.sender_id(),
            chat_type = ?ctx.chat_type(),
            "incoming message"
        );

        let opinion = self.classifier.evaluate(ctx).await;
        let branch = DispatchBranch::for_opinion(opinion.as_ref());

        #[cfg(feature = "metrics")]
        let branch_label = branch.as_str();
        #[cfg(feature = "metrics")]
        counter!(
            auto_reply_metrics::DISPATCH_BRANCH_TOTAL,
            labels::BRANCH => branch_label
        )
        .increment(1);

        let result = match branch {
            DispatchBranch::Drop => {
                info!(
                    reason = opinion.as_ref().and_then(|o| o.reason.as_deref()).unwrap_or(""),
                    "pre-classifier STOP, dropping message"
                );
                Ok(DispatchResult::skipped(STOP_SKIP_REASON))
            },
            DispatchBranch::Simple(text) => {
                info!("pre-classifier SIMPLE, replying directly");
                if !dispatcher.send(&text) {
                    warn!("dispatcher rejected pre-classified reply");
                }
                Ok(DispatchResult::pre_classified())
            },
            DispatchBranch::Deferred(action) => {
                info!(%action, "buffering not supported yet, forwarding as PROCESS");
                self.forward(ctx, dispatcher).await
            },
            DispatchBranch::Forward => self.forward(ctx, dispatcher).await,
        };

        #[cfg(feature = "metrics")]
        histogram!(
            auto_reply_metrics::DISPATCH_DURATION_SECONDS,
            labels::BRANCH => branch_label
        )
        .record(start.elapsed().as_secs_f64());

        result
    }

    async fn forward(
        &self,
        ctx: &FinalizedMsgContext,
        dispatcher: &dyn ReplyDispatcher,
    ) -> anyhow::Result<DispatchResult> {
        let result = match self.generator.generate(ctx, dispatcher).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "reply generation failed");
                #[cfg(feature = "metrics")]
                counter!(
                    auto_reply_metrics::GENERATION_FAILURES_TOTAL,
                    labels::CHANNEL => ctx.channel().to_string()
                )
                .increment(1);
                return Err(e);
            },
        };

        if let Some(reasoning) = &self.reasoning {
            // Detached: the turn's result never waits on publishing.
            if reasoning.spawn_for_turn(ctx) {
                debug!("reasoning publish scheduled");
            }
        }

        Ok(result)
    }
}
