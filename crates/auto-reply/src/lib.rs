//! Inbound message dispatch: the glue between channels and reply generation.
//!
//! Flow: channel message → finalize context → pre-classifier gate → drop,
//! canned reply, or forward to generation → drain the reply dispatcher →
//! (detached) republish the turn's reasoning.

pub mod classifier;
pub mod dispatch;
pub mod error;
pub mod reasoning;
pub mod reply_dispatcher;

pub use {
    classifier::{ClassifierAction, ClassifierGate, ClassifierOpinion, PreClassifier},
    dispatch::{
        DispatchBranch, DispatchResult, InboundDispatcher, ReplyGenerator, SIMPLE_FALLBACK_REPLY,
        STOP_SKIP_REASON,
    },
    error::{Error, Result},
    reasoning::{
        ReasoningPublisher, ReasoningSideChannel, ReasoningTarget, ThreadContext,
        extract_last_reasoning,
    },
    reply_dispatcher::{
        DEFAULT_TYPING_INTERVAL, MarkIdle, QueuedReplyDispatcher, ReplyDispatcher,
        ReplyDispatcherOptions, TypingDispatcherOptions, TypingReplyDispatcher,
        create_reply_dispatcher, create_reply_dispatcher_with_typing,
    },
};
