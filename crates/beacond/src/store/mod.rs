//! Record store collaborators.
//!
//! A record store maps record identifiers to flat attribute maps. Writes are
//! wholesale: storing a record replaces every attribute previously held under
//! the same identifier. Two implementations ship with the daemon: an in-memory
//! map used when no data directory is configured, and a JSON file that is
//! rewritten atomically after every write.

mod file;
mod memory;

use std::collections::BTreeMap;
use std::io;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::file::FileRecordStore;
pub use self::memory::MemoryRecordStore;

/// Attribute name that always mirrors the record identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// Attribute map held by a record.
pub type Attributes = BTreeMap<String, String>;

/// Stored record: an identifier plus its attributes.
///
/// On the wire the identifier appears as the `id` attribute alongside the
/// others, so a record serialises to a single flat JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    #[serde(flatten)]
    attributes: Attributes,
}

impl Record {
    /// Builds a record, discarding any `id` attribute in favour of `id`.
    #[must_use]
    pub fn new(id: impl Into<String>, mut attributes: Attributes) -> Self {
        attributes.remove(ID_ATTRIBUTE);
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Looks up an attribute. `id` resolves to the identifier.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == ID_ATTRIBUTE {
            return Some(&self.id);
        }
        self.attributes.get(name).map(String::as_str)
    }

    /// Attributes excluding the identifier.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Errors reported by record stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store lock was poisoned by a panicking writer.
    #[error("record store lock poisoned")]
    Poisoned,
    /// Reading or writing the backing file failed.
    #[error("record store I/O failed for '{path}': {source}")]
    Io {
        /// Backing file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The backing file did not contain valid records.
    #[error("record store file '{path}' is corrupt: {source}")]
    Decode {
        /// Backing file.
        path: Utf8PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// Serialising records for persistence failed.
    #[error("failed to encode records: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Keyed record storage shared by every connection.
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore: Send + Sync {
    /// Fetches a record by identifier.
    fn get(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Stores `attributes` under `id`, replacing any previous record.
    fn put(&self, id: &str, attributes: Attributes) -> Result<Record, StoreError>;

    /// Returns every stored record ordered by identifier.
    fn scan(&self) -> Result<Vec<Record>, StoreError>;
}
