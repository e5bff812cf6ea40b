//! Reasoning side-channel: after a turn completes, pull the agent's private
//! deliberation out of the session transcript and republish it.

pub mod extract;
pub mod publish;

use {
    courier_common::FinalizedMsgContext, courier_sessions::SessionStore,
    tokio_util::task::TaskTracker,
};

pub use {
    extract::{extract_last_reasoning, last_reasoning_in},
    publish::{
        MAX_REASONING_CHARS, ReasoningPublisher, ReasoningTarget, TRUNCATION_MARKER,
        ThreadContext, format_channel_reasoning, format_thread_reasoning, truncate_reasoning,
    },
};

/// Publisher bound to the transcript store it reads from.
///
/// Clones share one task tracker, so any clone can drain the publishes
/// started through another.
#[derive(Clone)]
pub struct ReasoningSideChannel {
    publisher: ReasoningPublisher,
    sessions: SessionStore,
    tasks: TaskTracker,
}

impl ReasoningSideChannel {
    pub fn new(publisher: ReasoningPublisher, sessions: SessionStore) -> Self {
        Self {
            publisher,
            sessions,
            tasks: TaskTracker::new(),
        }
    }

    pub fn publisher(&self) -> &ReasoningPublisher {
        &self.publisher
    }

    /// Spawn the detached extract-and-publish task for the turn triggered by
    /// `ctx`. Returns `false` when publishing is disabled.
    pub fn spawn_for_turn(&self, ctx: &FinalizedMsgContext) -> bool {
        if !self.publisher.is_enabled() {
            return false;
        }
        let target = ReasoningTarget {
            session_key: Some(ctx.session_key().to_string()),
            thread: ctx.message_id().map(|message_id| ThreadContext {
                channel_id: ctx.chat_id().to_string(),
                message_id: message_id.to_string(),
            }),
        };
        let transcript = self.sessions.transcript_path(ctx.session_key());
        let publisher = self.publisher.clone();
        self.tasks
            .spawn(async move { publisher.publish_from_transcript(transcript, target).await });
        true
    }

    /// Wait for every publish spawned so far. Later spawns still run but are
    /// not waited for.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }
}
