//! Parsing the wire form of an incoming body into a request or a
//! notification, before it reaches a [`crate::JsonRpcDispatcher`].

use serde_json::Value;

use crate::error::JsonRpcError;
use crate::request::{JsonRpcNotification, JsonRpcRequest};

/// Either shape a client may send: a request (has `id`, wants a reply) or a
/// notification (no `id`, fire-and-forget).
#[derive(Debug, Clone)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

/// Parses a raw JSON body into a [`JsonRpcMessage`], distinguishing a
/// request from a notification solely by the presence of the `id` field —
/// per the JSON-RPC 2.0 spec, a member with no `id` is a notification even
/// if every other field matches a request's shape.
pub fn parse_json_rpc_message(body: &[u8]) -> Result<JsonRpcMessage, JsonRpcError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| JsonRpcError::parse_error())?;

    if value.get("id").is_some() {
        let request: JsonRpcRequest =
            serde_json::from_value(value).map_err(|_| JsonRpcError::invalid_request(None))?;
        Ok(JsonRpcMessage::Request(request))
    } else {
        let notification: JsonRpcNotification =
            serde_json::from_value(value).map_err(|_| JsonRpcError::invalid_request(None))?;
        Ok(JsonRpcMessage::Notification(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_body_with_an_id_parses_as_a_request() {
        let body = br#"{"jsonrpc":"2.0","id":1,"method":"Heartbeat","params":{}}"#;
        let parsed = parse_json_rpc_message(body).unwrap();
        assert!(matches!(parsed, JsonRpcMessage::Request(_)));
    }

    #[test]
    fn a_body_without_an_id_parses_as_a_notification() {
        let body = br#"{"jsonrpc":"2.0","method":"ping"}"#;
        let parsed = parse_json_rpc_message(body).unwrap();
        assert!(matches!(parsed, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_json_rpc_message(b"not json").unwrap_err();
        assert_eq!(err.error.code, -32700);
    }
}
