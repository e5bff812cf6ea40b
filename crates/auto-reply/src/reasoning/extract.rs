use std::path::Path;

use {courier_sessions::TranscriptEntry, tracing::debug};

/// Deliberation text of the most recent agent turn in a transcript file.
///
/// A missing or unreadable file yields `None`; the caller treats that the same
/// as a turn without reasoning. Invalid UTF-8 is decoded lossily, so a corrupt
/// line only spoils that record.
pub async fn extract_last_reasoning(path: &Path) -> Option<String> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "transcript not readable");
            return None;
        },
    };
    last_reasoning_in(&String::from_utf8_lossy(&bytes))
}

/// Walk JSONL `content` backward and return the deliberation of the first
/// agent turn found. Malformed lines are skipped. If that turn carries no
/// deliberation the result is `None`; older turns are not consulted.
pub fn last_reasoning_in(content: &str) -> Option<String> {
    content
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| TranscriptEntry::parse(line).ok())
        .find(TranscriptEntry::is_agent_turn)
        .and_then(|entry| entry.reasoning())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_malformed_line_before_agent_turn() {
        let content = concat!(
            "{\"role\":\"assistant\",\"reasoning\":\"X\"}\n",
            "{this is not json\n",
        );
        assert_eq!(last_reasoning_in(content).as_deref(), Some("X"));
    }

    #[test]
    fn takes_most_recent_agent_turn() {
        let content = concat!(
            "{\"role\":\"assistant\",\"reasoning\":\"old\"}\n",
            "{\"role\":\"user\",\"content\":\"next\"}\n",
            "{\"type\":\"message\",\"message\":{\"role\":\"assistant\",\"content\":[{\"type\":\"thinking\",\"thinking\":\"new\"}]}}\n",
            "{\"role\":\"user\",\"content\":\"trailing\"}\n",
        );
        assert_eq!(last_reasoning_in(content).as_deref(), Some("new"));
    }

    #[test]
    fn latest_agent_turn_without_reasoning_decides() {
        let content = concat!(
            "{\"role\":\"assistant\",\"reasoning\":\"old\"}\n",
            "{\"role\":\"assistant\",\"content\":\"no thoughts\"}\n",
        );
        assert_eq!(last_reasoning_in(content), None);
    }

    #[test]
    fn no_agent_turn() {
        assert_eq!(last_reasoning_in("{\"role\":\"user\"}\n\n"), None);
        assert_eq!(last_reasoning_in(""), None);
    }

    #[tokio::test]
    async fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        std::fs::write(
            &path,
            "garbage\n{\"role\":\"assistant\",\"content\":[{\"type\":\"thinking\",\"thinking\":\"X\"}]}\n",
        )
        .unwrap();

        let first = extract_last_reasoning(&path).await;
        let second = extract_last_reasoning(&path).await;
        assert_eq!(first.as_deref(), Some("X"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        std::fs::write(
            &path,
            b"\xff\xfe garbage\n{\"role\":\"assistant\",\"reasoning\":\"X\"}\n\xff\n",
        )
        .unwrap();

        assert_eq!(extract_last_reasoning(&path).await.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            extract_last_reasoning(&dir.path().join("absent.jsonl")).await,
            None
        );
    }
}
