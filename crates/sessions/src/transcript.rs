//! Transcript records.
//!
//! A record is a JSON object with a `role` discriminator, either at the top
//! level (`{"role": "assistant", ...}`) or nested under `message`
//! (`{"type": "message", "message": {"role": "assistant", ...}}`). Everything
//! else in the record is kept as-is.

use serde_json::Value;

use crate::{Error, Result};

/// Speaker of a transcript record.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Role {
    User,
    Assistant,
    System,
    Tool,
    Other,
}

impl Role {
    fn parse(raw: &str) -> Self {
        match raw {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            "tool" | "tool_result" | "toolResult" => Self::Tool,
            _ => Self::Other,
        }
    }
}

/// One line of a session transcript.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    role: Role,
    value: Value,
}

impl TranscriptEntry {
    /// Parse a single JSONL line. Fails on invalid JSON or a missing role.
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let role = message_of(&value)
            .get("role")
            .and_then(Value::as_str)
            .map(Role::parse)
            .ok_or(Error::MissingRole)?;
        Ok(Self { role, value })
    }

    /// Whether this record is a turn produced by the agent.
    pub fn is_agent_turn(&self) -> bool {
        self.role == Role::Assistant
    }

    /// The agent's private deliberation for this turn, if any.
    pub fn reasoning(&self) -> Option<String> {
        extract_reasoning(message_of(&self.value))
    }
}

/// Pull deliberation text out of a message object.
///
/// Collects `{"type": "thinking", "thinking": "..."}` content blocks, joined
/// with newlines, and falls back to a plain `reasoning` string field.
pub fn extract_reasoning(message: &Value) -> Option<String> {
    let blocks: Vec<&str> = message
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("thinking"))
                .filter_map(|b| b.get("thinking").and_then(Value::as_str))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if !blocks.is_empty() {
        return Some(blocks.join("\n"));
    }

    message
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn message_of(value: &Value) -> &Value {
    match value.get("message") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn parses_top_level_role() {
        let entry = TranscriptEntry::parse(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert!(entry.is_agent_turn());
    }

    #[test]
    fn parses_nested_role() {
        let entry = TranscriptEntry::parse(
            r#"{"type":"message","message":{"role":"user","content":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(entry.role, Role::User);
    }

    #[test]
    fn missing_role_is_an_error() {
        assert!(matches!(
            TranscriptEntry::parse(r#"{"content":"hi"}"#),
            Err(Error::MissingRole)
        ));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            TranscriptEntry::parse("{not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn unknown_role_is_kept() {
        let entry = TranscriptEntry::parse(r#"{"role":"narrator"}"#).unwrap();
        assert_eq!(entry.role, Role::Other);
        assert!(!entry.is_agent_turn());
    }

    #[test]
    fn joins_thinking_blocks() {
        let msg = json!({
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": " first "},
                {"type": "text", "text": "answer"},
                {"type": "thinking", "thinking": "second"},
                {"type": "thinking", "thinking": "   "}
            ]
        });
        assert_eq!(extract_reasoning(&msg).as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn falls_back_to_reasoning_field() {
        let msg = json!({"role": "assistant", "content": "answer", "reasoning": "plan"});
        assert_eq!(extract_reasoning(&msg).as_deref(), Some("plan"));
    }

    #[test]
    fn no_reasoning() {
        let msg = json!({"role": "assistant", "content": [{"type": "text", "text": "a"}]});
        assert_eq!(extract_reasoning(&msg), None);
    }

    #[test]
    fn nested_entry_reasoning() {
        let entry = TranscriptEntry::parse(
            r#"{"type":"message","message":{"role":"assistant","content":[{"type":"thinking","thinking":"X"}]}}"#,
        )
        .unwrap();
        assert_eq!(entry.reasoning().as_deref(), Some("X"));
    }
}
