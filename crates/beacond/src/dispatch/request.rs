//! Request decoding and validation.
//!
//! A request line is decoded in two steps. [`RawRequest::parse`] only checks
//! that the line is a JSON object; the router audits that raw form before
//! [`RawRequest::validate`] turns it into a typed [`Request`] or a
//! validation error.

use std::fmt;

use serde_json::{Map, Value};

use crate::store::Attributes;

use super::errors::DispatchError;

/// Field carrying the client identifier.
pub const CLIENT_ID_FIELD: &str = "UUID";
/// Field carrying the action name.
pub const ACTION_FIELD: &str = "ACTION";
/// Field carrying the record identifier.
pub const ID_FIELD: &str = "ID";

/// Attribute names a `set` may store. Anything else is dropped.
pub const RECORD_ATTRIBUTES: [&str; 11] = [
    "cp",
    "CUIT",
    "domicilio",
    "idreq",
    "idSeq",
    "localidad",
    "provincia",
    "sede",
    "seqID",
    "telefono",
    "web",
];

/// Actions the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read one record.
    Get,
    /// Replace one record.
    Set,
    /// Enumerate all records.
    List,
    /// Enumerate the caller's audit entries.
    ListLog,
    /// Turn the connection into a notification stream.
    Subscribe,
}

impl Action {
    /// Parses an action name, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "set" => Some(Self::Set),
            "list" => Some(Self::List),
            "listlog" => Some(Self::ListLog),
            "subscribe" => Some(Self::Subscribe),
            _ => None,
        }
    }

    /// Canonical lower-case name, as echoed in responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::List => "list",
            Self::ListLog => "listlog",
            Self::Subscribe => "subscribe",
        }
    }

    /// Fields that must be present and non-empty for this action.
    #[must_use]
    pub const fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Get | Self::Set => &[ID_FIELD],
            Self::List | Self::ListLog | Self::Subscribe => &[],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Request decoded as a JSON object but not yet validated.
#[derive(Debug, Clone)]
pub struct RawRequest {
    fields: Map<String, Value>,
}

impl RawRequest {
    /// Parses a request line.
    ///
    /// Trailing whitespace (including a stray carriage return) is trimmed
    /// before parsing.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedRequest` if the line is empty, is not
    /// JSON, or is JSON but not an object.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }

        match serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DispatchError::malformed(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Client identifier, if present as a non-empty string.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.fields
            .get(CLIENT_ID_FIELD)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Action name exactly as sent, if present as a non-empty string.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.fields
            .get(ACTION_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Record identifier in textual form, if present and non-empty.
    #[must_use]
    pub fn item_id(&self) -> Option<String> {
        self.fields
            .get(ID_FIELD)
            .and_then(scalar_text)
            .filter(|value| !value.is_empty())
    }

    /// Names of the allow-listed attributes the request carries.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        RECORD_ATTRIBUTES
            .iter()
            .copied()
            .filter(|name| self.fields.contains_key(*name))
            .collect()
    }

    /// Validates presence of the client id and action, that the action is
    /// known, then the action's own required fields.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure in that order.
    pub fn validate(&self) -> Result<Request, DispatchError> {
        let Some(action_name) = self.action() else {
            return Err(DispatchError::MissingAction);
        };
        let Some(client_id) = self.client_id() else {
            return Err(DispatchError::missing_field(
                action_name.to_ascii_lowercase(),
                CLIENT_ID_FIELD,
            ));
        };
        let action =
            Action::parse(action_name).ok_or_else(|| DispatchError::unknown_action(action_name))?;

        let id = self.item_id();
        for field in action.required_fields() {
            if *field == ID_FIELD && id.is_none() {
                return Err(DispatchError::missing_field(action.as_str(), ID_FIELD));
            }
        }

        Ok(Request {
            client_id: client_id.to_owned(),
            action,
            id,
            attributes: self.recognised_attributes(),
        })
    }

    fn recognised_attributes(&self) -> Attributes {
        RECORD_ATTRIBUTES
            .iter()
            .filter_map(|name| {
                let value = self.fields.get(*name).and_then(scalar_text)?;
                Some(((*name).to_owned(), value))
            })
            .collect()
    }
}

/// Validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    client_id: String,
    action: Action,
    id: Option<String>,
    attributes: Attributes,
}

impl Request {
    /// Client that sent the request.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Requested action.
    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    /// Record identifier. Always present for `get` and `set`.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Allow-listed attributes carried by the request.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Text form of a JSON scalar. Strings pass through; numbers and booleans
/// use their JSON spelling; null and containers have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
