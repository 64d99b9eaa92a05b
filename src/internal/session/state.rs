//! Durable session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::serializer::SerializedContent;

/// Unique session identifier.
pub type SessionId = String;

/// Full persisted state of one session.
///
/// This is the only shape written to the full-session namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Unique session identifier.
    pub id: SessionId,
    /// When the session was created.
    pub start_time: DateTime<Utc>,
    /// When the history was last touched.
    pub last_active: DateTime<Utc>,
    /// Working directory for this session.
    #[serde(default)]
    pub working_dir: String,
    /// Conversation history (serialized entries).
    #[serde(default)]
    pub history: Vec<SerializedContent>,
    /// Per-entry token costs, prefix-aligned with `history`.
    #[serde(default)]
    pub token_counts: Vec<u64>,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub version: u64,
    /// Short description, see [`generate_summary`](super::serializer::generate_summary).
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub scratchpad: String,
    #[serde(default)]
    pub system_instruction: String,
}

impl SessionState {
    /// Get the number of history entries.
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Lightweight record for the history-summary namespace.
    pub fn to_summary(&self) -> HistorySummary {
        HistorySummary {
            id: self.id.clone(),
            start_time: self.start_time,
            last_active: self.last_active,
            working_dir: self.working_dir.clone(),
            summary: self.summary.clone(),
            message_count: self.history.len(),
            total_tokens: self.total_tokens,
        }
    }
}

/// Brief info about a saved session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub id: SessionId,
    pub start_time: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub working_dir: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub message_count: usize,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Generate a short, unique, time-ordered session ID.
pub fn generate_session_id() -> SessionId {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S%3f");
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    format!("{timestamp}-{pid:04x}-{count:04x}")
}
