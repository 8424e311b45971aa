//! Response serialisation helpers for the dispatch loop.

use std::io::Write;

use serde::Serialize;

use crate::audit::LogEntry;
use crate::store::Record;

use super::errors::DispatchError;
use super::request::Action;

/// Status reported in a subscribe acknowledgement.
pub const SUBSCRIBED_STATUS: &str = "subscribed";

/// Payload of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// A single record (`get`, `set`).
    Record(Record),
    /// Every stored record (`list`).
    Records(Vec<Record>),
    /// The caller's audit entries (`listlog`).
    Log(Vec<LogEntry>),
}

/// One response line.
///
/// Serialises to exactly one of `{"action", "data"}`, `{"error"}`, or the
/// subscribe acknowledgement `{"action", "status", "uuid"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// Successful one-shot action.
    Success {
        /// Action that succeeded.
        action: &'static str,
        /// Result payload.
        data: ResponseData,
    },
    /// Subscription accepted.
    Subscribed {
        /// Always `subscribe`.
        action: &'static str,
        /// Always [`SUBSCRIBED_STATUS`].
        status: &'static str,
        /// Client that subscribed.
        uuid: String,
    },
    /// Any failure.
    Error {
        /// Client-facing error text.
        error: String,
    },
}

impl Response {
    /// Successful response for `action`.
    #[must_use]
    pub fn success(action: Action, data: ResponseData) -> Self {
        Self::Success {
            action: action.as_str(),
            data,
        }
    }

    /// Subscribe acknowledgement for `client_id`.
    #[must_use]
    pub fn subscribed(client_id: impl Into<String>) -> Self {
        Self::Subscribed {
            action: Action::Subscribe.as_str(),
            status: SUBSCRIBED_STATUS,
            uuid: client_id.into(),
        }
    }

    /// Error response carrying the client-facing text of `error`.
    #[must_use]
    pub fn error(error: &DispatchError) -> Self {
        Self::Error {
            error: error.client_message(),
        }
    }
}

/// Writer that serialises responses to a stream.
///
/// The writer handles JSONL framing (appending the newline) and flushes after
/// every response, since each response is the last thing sent on a one-shot
/// connection.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response as a JSONL line and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation, writing or flushing fails.
    pub fn write_response(&mut self, response: &Response) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Attributes;

    fn written(response: &Response) -> String {
        let mut output = Vec::new();
        ResponseWriter::new(&mut output)
            .write_response(response)
            .expect("write response");
        String::from_utf8(output).expect("valid utf8")
    }

    #[test]
    fn success_line_has_action_and_data() {
        let record = Record::new("r1", Attributes::new());
        let line = written(&Response::success(Action::Get, ResponseData::Record(record)));
        assert_eq!(line, "{\"action\":\"get\",\"data\":{\"id\":\"r1\"}}\n");
    }

    #[test]
    fn acknowledgement_matches_wire_shape() {
        let line = written(&Response::subscribed("c1"));
        assert_eq!(
            line,
            "{\"action\":\"subscribe\",\"status\":\"subscribed\",\"uuid\":\"c1\"}\n"
        );
    }

    #[test]
    fn error_line_uses_client_message() {
        let line = written(&Response::error(&DispatchError::unknown_action("bogus")));
        assert_eq!(line, "{\"error\":\"unknown action: bogus\"}\n");
    }

    #[test]
    fn empty_list_serialises_as_empty_array() {
        let line = written(&Response::success(
            Action::List,
            ResponseData::Records(Vec::new()),
        ));
        assert_eq!(line, "{\"action\":\"list\",\"data\":[]}\n");
    }
}
