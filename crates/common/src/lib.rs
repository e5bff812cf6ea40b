//! Shared types and error helpers used across all courier crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{ChatType, FinalizedMsgContext, MsgContext},
};
