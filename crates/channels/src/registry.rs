use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{ChannelOutbound, Error, OutboundMessage, Result};

/// Provider id → outbound transport.
///
/// Providers without a dedicated entry use the fallback transport when one is
/// set, so adding a platform is a registration, not a code change at the call
/// sites.
#[derive(Default, Clone)]
pub struct OutboundRegistry {
    outbounds: HashMap<String, Arc<dyn ChannelOutbound>>,
    fallback: Option<Arc<dyn ChannelOutbound>>,
}

impl OutboundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: impl Into<String>, outbound: Arc<dyn ChannelOutbound>) {
        self.outbounds.insert(provider.into(), outbound);
    }

    /// Transport used for providers that have no dedicated registration.
    pub fn with_fallback(mut self, outbound: Arc<dyn ChannelOutbound>) -> Self {
        self.fallback = Some(outbound);
        self
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn ChannelOutbound>> {
        self.outbounds
            .get(provider)
            .or(self.fallback.as_ref())
            .cloned()
    }

    /// Deliver `message` through the transport registered for its provider.
    pub async fn send(&self, message: &OutboundMessage) -> Result<()> {
        if message.to.trim().is_empty() {
            return Err(Error::invalid_input("outbound message has no recipient"));
        }
        let outbound = self
            .get(&message.channel)
            .ok_or_else(|| Error::unknown_provider(&message.channel))?;
        debug!(
            provider = %message.channel,
            to = %message.to,
            threaded = message.reply_to_id.is_some(),
            "routing outbound message"
        );
        outbound
            .send_text(
                message.account_id(),
                &message.to,
                &message.content,
                message.reply_to_id.as_deref(),
            )
            .await
    }
}
