use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use super::{AuditError, AuditSink, LogEntry, keep_latest};

const AUDIT_FILE: &str = "audit.jsonl";
const AUDIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::audit");

/// Audit sink that appends one JSON object per line to `audit.jsonl`.
///
/// Lines that fail to decode are skipped with a warning when querying so a
/// single damaged entry does not hide the rest of the trail.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: Utf8PathBuf,
    writer: Mutex<()>,
}

impl JsonlAuditSink {
    /// Opens (or creates) the audit file inside `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn open(directory: &Utf8Path) -> Result<Self, AuditError> {
        fs::create_dir_all(directory).map_err(|source| AuditError::Io {
            path: directory.to_owned(),
            source,
        })?;
        Ok(Self {
            path: directory.join(AUDIT_FILE),
            writer: Mutex::new(()),
        })
    }

    /// Location of the audit file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> AuditError {
        AuditError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, entry: LogEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(&entry).map_err(AuditError::Encode)?;
        line.push(b'\n');
        let _guard = self.writer.lock().map_err(|_| AuditError::Poisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(&line).map_err(|source| self.io_error(source))
    }

    fn query_by_client(
        &self,
        client_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, AuditError> {
        let _guard = self.writer.lock().map_err(|_| AuditError::Poisoned)?;
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        let mut matching = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| self.io_error(source))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) if entry.client_id == client_id => matching.push(entry),
                Ok(_) => {}
                Err(error) => warn!(
                    target: AUDIT_TARGET,
                    path = %self.path,
                    line = index + 1,
                    %error,
                    "skipping undecodable audit entry"
                ),
            }
        }
        Ok(keep_latest(matching, limit))
    }
}
