use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    clap::Args,
    courier_auto_reply::{
        ClassifierGate, DispatchResult, InboundDispatcher, ReasoningPublisher,
        ReasoningSideChannel, ReplyDispatcher, ReplyDispatcherOptions, ReplyGenerator,
        TypingDispatcherOptions,
    },
    courier_channels::{
        ChannelOutbound, ChannelReplyTarget, DEFAULT_ACCOUNT_ID, OutboundRegistry,
        Result as ChannelResult,
    },
    courier_common::{FinalizedMsgContext, MsgContext},
    courier_config::CourierConfig,
    courier_metrics::{MetricsRecorderConfig, init_metrics},
    courier_sessions::SessionStore,
    serde_json::json,
    tracing::debug,
};

#[derive(Args)]
pub struct DispatchArgs {
    /// Channel the message arrived on (e.g. telegram, mattermost).
    #[arg(long, default_value = "cli")]
    channel: String,
    /// Bot account that received the message.
    #[arg(long, default_value = DEFAULT_ACCOUNT_ID)]
    account: String,
    /// Sender id.
    #[arg(long, default_value = "user")]
    sender: String,
    /// Chat id (defaults to the sender id).
    #[arg(long)]
    chat: Option<String>,
    /// Platform id of the inbound message, enables threaded replies.
    #[arg(long)]
    message_id: Option<String>,
    /// Session key (defaults to `channel:account:chat`).
    #[arg(long)]
    session: Option<String>,
    /// Show a typing indicator while the reply is produced.
    #[arg(long, default_value_t = false)]
    typing: bool,
    /// Print collected metrics to stderr after dispatching.
    #[arg(long, default_value_t = false)]
    print_metrics: bool,
    /// Message text.
    text: String,
}

/// Prints outbound messages to stdout instead of delivering them.
struct StdoutOutbound;

#[async_trait]
impl ChannelOutbound for StdoutOutbound {
    async fn send_text(
        &self,
        account_id: &str,
        to: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> ChannelResult<()> {
        match reply_to {
            Some(parent) => println!("[{account_id} → {to} ↳ {parent}] {text}"),
            None => println!("[{account_id} → {to}] {text}"),
        }
        Ok(())
    }

    async fn send_typing(&self, account_id: &str, to: &str) -> ChannelResult<()> {
        debug!(account_id, to, "typing");
        Ok(())
    }
}

/// Echoes the message back and records the exchange in the transcript,
/// including a short deliberation for the reasoning side-channel.
struct EchoGenerator {
    sessions: SessionStore,
}

#[async_trait]
impl ReplyGenerator for EchoGenerator {
    async fn generate(
        &self,
        ctx: &FinalizedMsgContext,
        dispatcher: &dyn ReplyDispatcher,
    ) -> Result<DispatchResult> {
        let reply = format!(
            "Echo: {}",
            if ctx.body().is_empty() {
                "(no text)"
            } else {
                ctx.body()
            }
        );
        self.sessions
            .append(
                ctx.session_key(),
                &json!({"role": "user", "content": ctx.body(), "timestamp": ctx.timestamp_ms()}),
            )
            .await?;
        let thinking = format!("echoing {} characters back", ctx.body().chars().count());
        self.sessions
            .append(
                ctx.session_key(),
                &json!({
                    "role": "assistant",
                    "content": [
                        {"type": "thinking", "thinking": thinking},
                        {"type": "text", "text": reply},
                    ],
                }),
            )
            .await?;
        dispatcher.send(&reply);
        Ok(DispatchResult::delivered())
    }
}

pub async fn handle_dispatch(args: DispatchArgs, config: CourierConfig) -> Result<()> {
    let metrics = init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        ..Default::default()
    })?;

    let outbound: Arc<dyn ChannelOutbound> = Arc::new(StdoutOutbound);
    let sessions = SessionStore::new(config.sessions.resolve_dir());

    let mut dispatcher = InboundDispatcher::new(
        Arc::new(ClassifierGate::new(&config.pre_classifier)),
        Arc::new(EchoGenerator {
            sessions: sessions.clone(),
        }),
    );
    let reasoning = config.reasoning.enabled.then(|| {
        let transports = OutboundRegistry::new().with_fallback(Arc::clone(&outbound));
        let publisher = ReasoningPublisher::new(config.reasoning.clone(), transports);
        ReasoningSideChannel::new(publisher, sessions)
    });
    if let Some(side) = &reasoning {
        dispatcher = dispatcher.with_reasoning(side.clone());
    }

    let chat_id = args.chat.unwrap_or_else(|| args.sender.clone());
    let ctx = MsgContext {
        channel: args.channel.clone(),
        account_id: args.account.clone(),
        sender_id: args.sender,
        chat_id: chat_id.clone(),
        message_id: args.message_id.clone(),
        session_key: args.session,
        body: args.text,
        ..Default::default()
    };
    let reply = ReplyDispatcherOptions {
        outbound,
        target: ChannelReplyTarget {
            channel_type: args.channel,
            account_id: args.account,
            chat_id,
            reply_to_id: args.message_id,
        },
    };

    let result = if args.typing {
        dispatcher
            .dispatch_with_buffered_dispatcher(ctx, TypingDispatcherOptions::new(reply))
            .await?
    } else {
        dispatcher.dispatch_with_dispatcher(ctx, reply).await?
    };

    println!("{}", serde_json::to_string(&result)?);

    // The result is out; let detached reasoning publishes finish before exit.
    if let Some(side) = reasoning {
        side.shutdown().await;
    }

    if args.print_metrics {
        eprint!("{}", metrics.render());
    }

    Ok(())
}
