//! Error types for request dispatch failures.
//!
//! Each variant carries enough context for the server log; what the client
//! sees is the fixed wire text returned by [`DispatchError::client_message`].

use std::fmt;
use std::io;

use thiserror::Error;

use crate::audit::AuditError;
use crate::services::ServiceError;
use crate::store::StoreError;

/// Store operation a [`DispatchError::Store`] failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    /// Single-record read.
    Get,
    /// Record write.
    Set,
    /// Full enumeration.
    List,
}

impl StoreOperation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::List => "list",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Errors surfaced during request parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line was not a JSON object.
    #[error("malformed request: {message}")]
    MalformedRequest {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Request line exceeded the configured size limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },

    /// The request carried no action.
    #[error("request has no ACTION field")]
    MissingAction,

    /// The action is not one the server handles.
    #[error("unknown action: {action}")]
    UnknownAction { action: String },

    /// A field the action needs was absent or empty.
    #[error("{action} requires field: {field}")]
    MissingField { action: String, field: &'static str },

    /// A `set` carried no recognised attribute.
    #[error("set carried no recognised attributes")]
    NoValidFields,

    /// A `get` named a record that does not exist.
    #[error("record '{id}' not found")]
    NotFound { id: String },

    /// The record store rejected the operation.
    #[error("record store {operation} failed: {source}")]
    Store {
        operation: StoreOperation,
        #[source]
        source: StoreError,
    },

    /// The audit sink could not be queried.
    #[error("audit query failed: {0}")]
    Audit(#[source] AuditError),

    /// A shared service could not be constructed.
    #[error("shared service unavailable: {0}")]
    Services(#[from] ServiceError),

    /// IO error while writing the response.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialisation failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Wire text sent to the client in `{"error": ...}`.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::MalformedRequest { .. } | Self::RequestTooLarge { .. } => {
                "invalid format".to_owned()
            }
            Self::MissingAction => "missing required field: ACTION".to_owned(),
            Self::UnknownAction { action } => format!("unknown action: {action}"),
            Self::MissingField { action, field } => format!("{action} requires field: {field}"),
            Self::NoValidFields => "no valid data fields provided".to_owned(),
            Self::NotFound { .. } => "item not found".to_owned(),
            Self::Store { operation, .. } => format!("failed to {operation} data"),
            Self::Audit(_) => "failed to list logs".to_owned(),
            Self::Services(_) | Self::Io(_) | Self::SerializeResponse(_) => {
                "internal server error".to_owned()
            }
        }
    }

    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unknown action error.
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(action: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            action: action.into(),
            field,
        }
    }

    /// Wraps a store failure for the given operation.
    pub fn store(operation: StoreOperation, source: StoreError) -> Self {
        Self::Store { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::malformed(DispatchError::malformed("x"), "invalid format")]
    #[case::too_large(DispatchError::RequestTooLarge { size: 9, max_size: 8 }, "invalid format")]
    #[case::unknown(DispatchError::unknown_action("bogus"), "unknown action: bogus")]
    #[case::missing_id(DispatchError::missing_field("get", "ID"), "get requires field: ID")]
    #[case::no_fields(DispatchError::NoValidFields, "no valid data fields provided")]
    #[case::not_found(DispatchError::NotFound { id: "r1".to_owned() }, "item not found")]
    #[case::set_failed(
        DispatchError::store(StoreOperation::Set, StoreError::Poisoned),
        "failed to set data"
    )]
    #[case::list_failed(
        DispatchError::store(StoreOperation::List, StoreError::Poisoned),
        "failed to list data"
    )]
    #[case::audit_failed(DispatchError::Audit(AuditError::Poisoned), "failed to list logs")]
    #[case::io(
        DispatchError::Io(io::Error::from(io::ErrorKind::BrokenPipe)),
        "internal server error"
    )]
    fn client_messages_are_fixed(#[case] error: DispatchError, #[case] expected: &str) {
        assert_eq!(error.client_message(), expected);
    }
}
