use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use fd_lock::RwLock;

use crate::{Error, Result};

/// Append-only JSONL transcript storage with file locking.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_dir: PathBuf,
}

impl SessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Sanitize a session key for use as a filename.
    pub fn key_to_filename(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                ':' | '/' | '\\' => '_',
                c => c,
            })
            .collect()
    }

    /// Path of the transcript file backing `key`. The file may not exist yet.
    pub fn transcript_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.jsonl", Self::key_to_filename(key)))
    }

    /// Append a record as a single line to the session transcript.
    pub async fn append(&self, key: &str, record: &serde_json::Value) -> Result<()> {
        let path = self.transcript_path(key);
        let line = serde_json::to_string(record)?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut lock = RwLock::new(file);
            let mut guard = lock
                .write()
                .map_err(|e| Error::lock_failed(e.to_string()))?;
            writeln!(*guard, "{line}")?;
            Ok(())
        })
        .await??;

        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::TranscriptEntry, serde_json::json};

    fn temp_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        (store, dir)
    }

    fn lines(store: &SessionStore, key: &str) -> Vec<String> {
        fs::read_to_string(store.transcript_path(key))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_append_one_record_per_line() {
        let (store, _dir) = temp_store();

        store
            .append("main", &json!({"role": "user", "content": "hello"}))
            .await
            .unwrap();
        store
            .append("main", &json!({"role": "assistant", "content": "a\nb"}))
            .await
            .unwrap();

        let lines = lines(&store, "main");
        assert_eq!(lines.len(), 2);
        assert!(!TranscriptEntry::parse(&lines[0]).unwrap().is_agent_turn());
        assert!(TranscriptEntry::parse(&lines[1]).unwrap().is_agent_turn());
    }

    #[tokio::test]
    async fn test_append_creates_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("sessions"));

        store.append("main", &json!({"role": "user"})).await.unwrap();

        assert!(store.transcript_path("main").exists());
    }

    #[tokio::test]
    async fn test_key_sanitization() {
        let (store, dir) = temp_store();

        store
            .append("telegram:bot1:42", &json!({"role": "user"}))
            .await
            .unwrap();
        assert!(dir.path().join("telegram_bot1_42.jsonl").exists());
        assert_eq!(lines(&store, "telegram:bot1:42").len(), 1);
    }

    #[test]
    fn test_key_to_filename_strips_separators() {
        assert_eq!(SessionStore::key_to_filename("a/b\\c:d"), "a_b_c_d");
    }
}
