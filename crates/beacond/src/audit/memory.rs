use std::sync::Mutex;

use super::{AuditError, AuditSink, LogEntry, keep_latest};

/// Audit sink that keeps entries in process memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryAuditSink {
    /// Builds an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: LogEntry) -> Result<(), AuditError> {
        let mut entries = self.entries.lock().map_err(|_| AuditError::Poisoned)?;
        entries.push(entry);
        Ok(())
    }

    fn query_by_client(
        &self,
        client_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, AuditError> {
        let entries = self.entries.lock().map_err(|_| AuditError::Poisoned)?;
        let matching = entries
            .iter()
            .filter(|entry| entry.client_id == client_id)
            .cloned()
            .collect();
        Ok(keep_latest(matching, limit))
    }
}
