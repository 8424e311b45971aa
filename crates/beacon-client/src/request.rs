//! Request payloads sent to the server.

use serde::Serialize;

use crate::Record;

/// One request line. Record attributes sit beside the protocol fields.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    #[serde(rename = "UUID")]
    client_id: &'a str,
    #[serde(rename = "ACTION")]
    action: &'static str,
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    item_id: Option<&'a str>,
    #[serde(flatten)]
    attributes: Option<&'a Record>,
}

impl<'a> Request<'a> {
    pub(crate) fn new(client_id: &'a str, action: &'static str) -> Self {
        Self {
            client_id,
            action,
            item_id: None,
            attributes: None,
        }
    }

    pub(crate) fn with_item(mut self, item_id: &'a str) -> Self {
        self.item_id = Some(item_id);
        self
    }

    pub(crate) fn with_attributes(mut self, attributes: &'a Record) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_request_flattens_attributes() {
        let attributes = Record::from([("sede".to_owned(), "Norte".to_owned())]);
        let request = Request::new("c1", "set")
            .with_item("r1")
            .with_attributes(&attributes);
        let json = serde_json::to_value(&request).expect("serialise request");
        assert_eq!(
            json,
            json!({"UUID": "c1", "ACTION": "set", "ID": "r1", "sede": "Norte"})
        );
    }

    #[test]
    fn list_request_omits_identifier() {
        let json = serde_json::to_value(Request::new("c1", "list")).expect("serialise request");
        assert_eq!(json, json!({"UUID": "c1", "ACTION": "list"}));
    }
}
