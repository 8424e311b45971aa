//! Append-only audit trail of client requests.
//!
//! Every request is recorded before it is validated, so rejected requests
//! leave a trace too. Entries are queried back per client by the `listlog`
//! action.

mod jsonl;
mod memory;

use std::io;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::utc_timestamp;

pub use self::jsonl::JsonlAuditSink;
pub use self::memory::MemoryAuditSink;

/// Audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier of this entry.
    #[serde(rename = "id")]
    pub entry_id: Uuid,
    /// Client identifier the request carried.
    #[serde(rename = "uuid")]
    pub client_id: String,
    /// Server session that recorded the entry.
    #[serde(rename = "session")]
    pub session_id: String,
    /// Requested action, upper-cased.
    pub action: String,
    /// Record identifier, when the request named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// RFC 3339 UTC time the entry was recorded.
    pub timestamp: String,
    /// Free-form context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Builds an entry stamped with a fresh identifier and the current time.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        session_id: impl Into<String>,
        action: &str,
        item_id: Option<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            client_id: client_id.into(),
            session_id: session_id.into(),
            action: action.to_uppercase(),
            item_id,
            timestamp: utc_timestamp(),
            details: None,
        }
    }

    /// Attaches free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Errors reported by audit sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink lock was poisoned by a panicking writer.
    #[error("audit sink lock poisoned")]
    Poisoned,
    /// Reading or appending to the audit file failed.
    #[error("audit I/O failed for '{path}': {source}")]
    Io {
        /// Audit file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising an entry failed.
    #[error("failed to encode audit entry: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Destination for audit entries.
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    /// Appends an entry.
    fn append(&self, entry: LogEntry) -> Result<(), AuditError>;

    /// Returns entries recorded for `client_id`, oldest first, keeping at
    /// most the `limit` most recent when a limit is given.
    fn query_by_client(
        &self,
        client_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, AuditError>;
}

/// Keeps the most recent `limit` entries of an oldest-first list.
fn keep_latest(mut entries: Vec<LogEntry>, limit: Option<usize>) -> Vec<LogEntry> {
    if let Some(limit) = limit
        && entries.len() > limit
    {
        entries.drain(..entries.len() - limit);
    }
    entries
}
