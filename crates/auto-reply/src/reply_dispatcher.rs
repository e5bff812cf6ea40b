//! Reply dispatchers: the handle a turn uses to emit outbound messages.
//!
//! Sends are queued and delivered by a single worker task per dispatcher, so
//! everything submitted to one dispatcher reaches the channel in submission
//! order without callers serializing among themselves. A dispatcher must be
//! created inside a tokio runtime.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    courier_channels::{ChannelOutbound, ChannelReplyTarget},
    tokio::sync::{mpsc, watch},
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{auto_reply as auto_reply_metrics, counter, labels};

/// Re-send cadence for the typing indicator. Most platforms expire it after ~5s.
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_secs(4);

/// Capability used to emit the replies of one turn.
#[async_trait]
pub trait ReplyDispatcher: Send + Sync {
    /// Queue `text` for delivery. Returns `false` if the dispatcher no longer
    /// accepts sends.
    fn send(&self, text: &str) -> bool;

    /// Resolve once every send queued so far has been delivered (or failed).
    async fn wait_for_idle(&self);
}

/// Where and how a dispatcher delivers.
#[derive(Clone)]
pub struct ReplyDispatcherOptions {
    pub outbound: Arc<dyn ChannelOutbound>,
    pub target: ChannelReplyTarget,
}

/// Options for a dispatcher that shows a typing indicator while busy.
pub struct TypingDispatcherOptions {
    pub base: ReplyDispatcherOptions,
    pub typing_interval: Duration,
    /// Invoked once when the owner marks the dispatch idle.
    pub on_idle: Option<Box<dyn FnOnce() + Send>>,
}

impl TypingDispatcherOptions {
    pub fn new(base: ReplyDispatcherOptions) -> Self {
        Self {
            base,
            typing_interval: DEFAULT_TYPING_INTERVAL,
            on_idle: None,
        }
    }

    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    pub fn with_on_idle(mut self, on_idle: impl FnOnce() + Send + 'static) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }
}

/// Build a dispatcher that delivers straight through to the transport.
///
/// The caller owns its lifetime and must await
/// [`ReplyDispatcher::wait_for_idle`] before treating the turn as complete.
pub fn create_reply_dispatcher(options: ReplyDispatcherOptions) -> QueuedReplyDispatcher {
    QueuedReplyDispatcher::spawn(options)
}

/// Build a typing-bracketed dispatcher.
///
/// The indicator starts on the first send and stops when the returned
/// [`MarkIdle`] fires. The caller must fire it once on every exit path;
/// dropping it unfired fires it too.
pub fn create_reply_dispatcher_with_typing(
    options: TypingDispatcherOptions,
) -> (TypingReplyDispatcher, MarkIdle) {
    let typing = Arc::new(TypingIndicator {
        outbound: Arc::clone(&options.base.outbound),
        account_id: options.base.target.account_id.clone(),
        chat_id: options.base.target.chat_id.clone(),
        interval: options.typing_interval,
        started: AtomicBool::new(false),
        stop: CancellationToken::new(),
    });
    let dispatcher = TypingReplyDispatcher {
        inner: QueuedReplyDispatcher::spawn(options.base),
        typing: Arc::clone(&typing),
    };
    let mark_idle = MarkIdle {
        typing,
        on_idle: options.on_idle,
    };
    (dispatcher, mark_idle)
}

// ── Immediate ───────────────────────────────────────────────────────────────

/// Dispatcher backed by an ordered delivery queue.
pub struct QueuedReplyDispatcher {
    tx: mpsc::UnboundedSender<String>,
    pending: Arc<watch::Sender<usize>>,
}

impl QueuedReplyDispatcher {
    fn spawn(options: ReplyDispatcherOptions) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let pending = Arc::new(watch::Sender::new(0usize));

        let worker_pending = Arc::clone(&pending);
        let ReplyDispatcherOptions { outbound, target } = options;
        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = outbound
                    .send_text(
                        &target.account_id,
                        &target.chat_id,
                        &text,
                        target.reply_to_id.as_deref(),
                    )
                    .await
                {
                    warn!(
                        channel = %target.channel_type,
                        account_id = %target.account_id,
                        chat_id = %target.chat_id,
                        error = %e,
                        "reply delivery failed"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(
                        auto_reply_metrics::DELIVERY_FAILURES_TOTAL,
                        labels::CHANNEL => target.channel_type.clone()
                    )
                    .increment(1);
                }
                worker_pending.send_modify(|n| *n = n.saturating_sub(1));
            }
        });

        Self { tx, pending }
    }

    /// Number of queued sends not yet delivered.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }
}

#[async_trait]
impl ReplyDispatcher for QueuedReplyDispatcher {
    fn send(&self, text: &str) -> bool {
        self.pending.send_modify(|n| *n += 1);
        if self.tx.send(text.to_string()).is_err() {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
            return false;
        }
        true
    }

    async fn wait_for_idle(&self) {
        let mut rx = self.pending.subscribe();
        // A worker that died mid-delivery leaves its count behind; the closed
        // queue ends the wait instead.
        tokio::select! {
            biased;
            _ = rx.wait_for(|n| *n == 0) => {},
            _ = self.tx.closed() => {
                warn!(pending = self.pending(), "reply worker exited with sends undelivered");
            },
        }
    }
}

// ── Typing-bracketed ────────────────────────────────────────────────────────

struct TypingIndicator {
    outbound: Arc<dyn ChannelOutbound>,
    account_id: String,
    chat_id: String,
    interval: Duration,
    started: AtomicBool,
    stop: CancellationToken,
}

impl TypingIndicator {
    fn start(&self) {
        if self.stop.is_cancelled() || self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let outbound = Arc::clone(&self.outbound);
        let account_id = self.account_id.clone();
        let chat_id = self.chat_id.clone();
        let interval = self.interval;
        let stop = self.stop.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = outbound.send_typing(&account_id, &chat_id).await {
                    debug!("typing indicator failed: {e}");
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {},
                    _ = stop.cancelled() => break,
                }
            }
        });
    }
}

/// Dispatcher that shows a typing indicator from the first send until idle.
pub struct TypingReplyDispatcher {
    inner: QueuedReplyDispatcher,
    typing: Arc<TypingIndicator>,
}

#[async_trait]
impl ReplyDispatcher for TypingReplyDispatcher {
    fn send(&self, text: &str) -> bool {
        self.typing.start();
        self.inner.send(text)
    }

    async fn wait_for_idle(&self) {
        self.inner.wait_for_idle().await;
    }
}

/// One-shot idle signal for a typing-bracketed dispatcher.
///
/// Fires at most once: either through [`MarkIdle::mark`] or on drop.
pub struct MarkIdle {
    typing: Arc<TypingIndicator>,
    on_idle: Option<Box<dyn FnOnce() + Send>>,
}

impl MarkIdle {
    pub fn mark(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        self.typing.stop.cancel();
        if let Some(on_idle) = self.on_idle.take() {
            on_idle();
        }
    }
}

impl Drop for MarkIdle {
    fn drop(&mut self) {
        self.fire();
    }
}
