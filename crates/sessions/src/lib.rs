//! Session transcript storage.
//!
//! Transcripts are append-only JSONL files (one record per line) at
//! `<sessions_dir>/<sessionKey>.jsonl`, written under a file lock.

pub mod error;
pub mod store;
pub mod transcript;

pub use {
    error::{Error, Result},
    store::SessionStore,
    transcript::{TranscriptEntry, extract_reasoning},
};
