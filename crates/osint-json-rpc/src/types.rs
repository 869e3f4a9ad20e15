use serde::{Deserialize, Serialize};
use std::fmt;

/// The `jsonrpc` version marker. Only `"2.0"` is supported; this exists as
/// its own type (rather than a bare `String`) so a malformed version string
/// fails to deserialize instead of silently being accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonRpcVersion {
    #[serde(rename = "2.0")]
    V2_0,
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "2.0")
    }
}

/// A JSON-RPC request/response identifier. Requests use `Number` or
/// `String`; notifications have no id at all (so `RequestId` never appears
/// there).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_serializes_as_2_0() {
        assert_eq!(serde_json::to_string(&JsonRpcVersion::V2_0).unwrap(), "\"2.0\"");
    }

    #[test]
    fn request_id_round_trips_both_variants() {
        let n: RequestId = 7.into();
        let s: RequestId = "abc".into();
        assert_eq!(serde_json::from_str::<RequestId>(&serde_json::to_string(&n).unwrap()).unwrap(), n);
        assert_eq!(serde_json::from_str::<RequestId>(&serde_json::to_string(&s).unwrap()).unwrap(), s);
    }
}
