//! Messages the server sends back.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ClientError;

/// Stored record: the `id` attribute plus every other stored attribute.
pub type Record = BTreeMap<String, String>;

/// One entry of the caller's audit log, as returned by `listlog`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: String,
    /// Client that issued the request.
    pub uuid: String,
    /// Server session that handled the request.
    pub session: String,
    /// Upper-cased action name as requested.
    pub action: String,
    /// Record identifier, when the request named one.
    #[serde(default)]
    pub item_id: Option<String>,
    /// RFC 3339 UTC time the request was handled.
    pub timestamp: String,
    /// Extra context recorded with the entry.
    #[serde(default)]
    pub details: Option<Value>,
}

/// Update pushed to subscribers after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Notification {
    /// Always `update`.
    pub action: String,
    /// Identifier of the record that changed.
    pub item_id: String,
    /// Record as stored by the write.
    pub data: Record,
    /// RFC 3339 UTC time the server built the notification.
    pub timestamp: String,
}

/// Any reply line, before it is narrowed to the caller's expectations.
///
/// The payload stays untyped until the action has been checked, so a reply
/// for the wrong action is reported as such even when its data has a
/// different shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Reply {
    Error {
        error: String,
    },
    Subscribed {
        action: String,
        status: String,
        #[serde(rename = "uuid")]
        client_id: String,
    },
    Data {
        action: String,
        data: Value,
    },
}

impl Reply {
    pub(crate) fn parse(line: &str) -> Result<Self, ClientError> {
        serde_json::from_str(line).map_err(ClientError::ParseMessage)
    }

    /// Payload of a successful `expected` reply.
    pub(crate) fn into_data<T: DeserializeOwned>(
        self,
        expected: &'static str,
    ) -> Result<T, ClientError> {
        match self {
            Self::Error { error } => Err(ClientError::Server { message: error }),
            Self::Data { action, data } if action == expected => {
                serde_json::from_value(data).map_err(ClientError::ParseMessage)
            }
            Self::Data { action, .. } | Self::Subscribed { action, .. } => {
                Err(ClientError::UnexpectedAction {
                    expected,
                    actual: action,
                })
            }
        }
    }

    /// Accepts only a subscribe acknowledgement and returns the client id
    /// the server registered.
    pub(crate) fn into_acknowledgement(self) -> Result<String, ClientError> {
        match self {
            Self::Error { error } => Err(ClientError::Server { message: error }),
            Self::Subscribed {
                action,
                status,
                client_id,
            } if action == "subscribe" && status == "subscribed" => Ok(client_id),
            Self::Subscribed { action, .. } | Self::Data { action, .. } => {
                Err(ClientError::UnexpectedAction {
                    expected: "subscribe",
                    actual: action,
                })
            }
        }
    }
}
