//! Outbound channel transports.
//!
//! Each messaging platform (Mattermost, Telegram, Slack, ...) implements
//! [`ChannelOutbound`]; the [`OutboundRegistry`] maps provider ids to those
//! implementations so callers can address a platform by name.

pub mod error;
pub mod outbound;
pub mod registry;

pub use {
    error::{Error, Result},
    outbound::{ChannelOutbound, ChannelReplyTarget, DEFAULT_ACCOUNT_ID, OutboundMessage},
    registry::OutboundRegistry,
};
