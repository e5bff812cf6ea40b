//! Inbound message context shared by channels, sessions, and the reply pipeline.

use serde::{Deserialize, Serialize};

/// Kind of conversation an inbound message arrived in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    #[default]
    Direct,
    Group,
    Channel,
}

/// Raw inbound message as handed over by a channel plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MsgContext {
    /// Channel identifier (e.g. "telegram", "mattermost").
    pub channel: String,
    pub account_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    /// Chat/peer the message was posted in.
    pub chat_id: String,
    pub chat_type: ChatType,
    /// Platform id of the inbound message, used for threaded replies.
    pub message_id: Option<String>,
    pub session_key: Option<String>,
    pub body: String,
    /// Receive time in epoch milliseconds.
    pub timestamp_ms: Option<u64>,
}

impl MsgContext {
    /// Normalize and freeze this context.
    #[must_use]
    pub fn finalize(self) -> FinalizedMsgContext {
        let body = normalize_newlines(&self.body);
        let session_key = match self.session_key {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => format!("{}:{}:{}", self.channel, self.account_id, self.chat_id),
        };

        FinalizedMsgContext {
            channel: self.channel,
            account_id: self.account_id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            chat_id: self.chat_id,
            chat_type: self.chat_type,
            message_id: self.message_id.filter(|id| !id.is_empty()),
            session_key,
            body,
            raw_body: self.body,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(now_ms),
        }
    }
}

/// Normalized, immutable view of an inbound message.
///
/// Only obtainable through [`MsgContext::finalize`]; converting a finalized
/// context again is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedMsgContext {
    channel: String,
    account_id: String,
    sender_id: String,
    sender_name: Option<String>,
    chat_id: String,
    chat_type: ChatType,
    message_id: Option<String>,
    session_key: String,
    body: String,
    raw_body: String,
    timestamp_ms: u64,
}

impl FinalizedMsgContext {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn sender_name(&self) -> Option<&str> {
        self.sender_name.as_deref()
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn chat_type(&self) -> ChatType {
        self.chat_type
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Body with line endings normalized to `\n`.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Body exactly as the channel delivered it.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl From<MsgContext> for FinalizedMsgContext {
    fn from(ctx: MsgContext) -> Self {
        ctx.finalize()
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MsgContext {
        MsgContext {
            channel: "telegram".into(),
            account_id: "bot1".into(),
            sender_id: "alice".into(),
            chat_id: "42".into(),
            body: "hello\r\nworld\ragain".into(),
            timestamp_ms: Some(1_700_000_000_000),
            ..Default::default()
        }
    }

    #[test]
    fn finalize_normalizes_newlines_and_keeps_raw_body() {
        let ctx = sample().finalize();
        assert_eq!(ctx.body(), "hello\nworld\nagain");
        assert_eq!(ctx.raw_body(), "hello\r\nworld\ragain");
    }

    #[test]
    fn finalize_derives_session_key() {
        let ctx = sample().finalize();
        assert_eq!(ctx.session_key(), "telegram:bot1:42");
    }

    #[test]
    fn finalize_keeps_explicit_session_key() {
        let mut raw = sample();
        raw.session_key = Some(" main ".into());
        assert_eq!(raw.finalize().session_key(), "main");
    }

    #[test]
    fn blank_session_key_falls_back() {
        let mut raw = sample();
        raw.session_key = Some("   ".into());
        assert_eq!(raw.finalize().session_key(), "telegram:bot1:42");
    }

    #[test]
    fn finalize_stamps_missing_timestamp() {
        let mut raw = sample();
        raw.timestamp_ms = None;
        assert!(raw.finalize().timestamp_ms() > 0);
    }

    #[test]
    fn empty_message_id_is_dropped() {
        let mut raw = sample();
        raw.message_id = Some(String::new());
        assert_eq!(raw.finalize().message_id(), None);
    }

    #[test]
    fn refinalizing_is_identity() {
        let once = sample().finalize();
        let twice = FinalizedMsgContext::from(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn deserializes_camel_case() {
        let raw: MsgContext = serde_json::from_value(serde_json::json!({
            "channel": "mattermost",
            "senderId": "bob",
            "chatId": "town-square",
            "chatType": "group",
            "messageId": "post1",
            "body": "hi"
        }))
        .unwrap();
        assert_eq!(raw.chat_type, ChatType::Group);
        assert_eq!(raw.finalize().message_id(), Some("post1"));
    }
}
