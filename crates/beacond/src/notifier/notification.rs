use serde::{Deserialize, Serialize};

use crate::clock::utc_timestamp;
use crate::store::Record;

/// Action tag carried by every change notification.
pub const UPDATE_ACTION: &str = "update";

/// Message pushed to subscribers after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Always [`UPDATE_ACTION`].
    pub action: String,
    /// Identifier of the record that changed.
    pub item_id: String,
    /// Record as stored by the write.
    pub data: Record,
    /// RFC 3339 UTC time the notification was built.
    pub timestamp: String,
}

impl Notification {
    /// Builds an update notification for a freshly written record.
    #[must_use]
    pub fn update(record: Record) -> Self {
        Self {
            action: UPDATE_ACTION.to_owned(),
            item_id: record.id().to_owned(),
            data: record,
            timestamp: utc_timestamp(),
        }
    }

    /// Serialises the notification as one newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}
