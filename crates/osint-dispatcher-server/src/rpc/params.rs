use chrono::{DateTime, Utc};
use osint_json_rpc::RequestParams;
use osint_protocol::OsintError;
use serde_json::Value;

/// Pulls a required string param out by name. A missing or wrong-typed
/// param is a malformed request, not a domain failure — it surfaces as a
/// JSON-RPC `invalid_params` error rather than a `(success=false)` body.
pub fn required_str(params: &Option<RequestParams>, name: &str) -> Result<String, OsintError> {
    params
        .as_ref()
        .and_then(|p| p.get(name))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| OsintError::InvalidArgument(format!("missing or non-string param '{name}'")))
}

/// Like [`required_str`] but defaults to an empty string, for optional CSV
/// fields (`categories`, `locations`) that should mean "none" rather than
/// an error when absent.
pub fn optional_str(params: &Option<RequestParams>, name: &str) -> String {
    params
        .as_ref()
        .and_then(|p| p.get(name))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

pub fn required_datetime(params: &Option<RequestParams>, name: &str) -> Result<DateTime<Utc>, OsintError> {
    let raw = required_str(params, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OsintError::InvalidArgument(format!("param '{name}' is not a valid RFC3339 timestamp: {e}")))
}

pub fn optional_datetime(params: &Option<RequestParams>, name: &str) -> Option<DateTime<Utc>> {
    params
        .as_ref()
        .and_then(|p| p.get(name))
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Splits a comma-separated tag field into trimmed, non-empty entries.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn success(message: impl Into<String>) -> Value {
    serde_json::json!({ "success": true, "message": message.into() })
}

pub fn failure(message: impl Into<String>) -> Value {
    serde_json::json!({ "success": false, "message": message.into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params_with(key: &str, value: Value) -> Option<RequestParams> {
        let mut map = HashMap::new();
        map.insert(key.to_string(), value);
        Some(RequestParams::Object(map))
    }

    #[test]
    fn required_str_errors_on_missing_param() {
        let err = required_str(&None, "username").unwrap_err();
        assert!(matches!(err, OsintError::InvalidArgument(_)));
    }

    #[test]
    fn required_str_reads_present_param() {
        let params = params_with("username", Value::String("alice".to_string()));
        assert_eq!(required_str(&params, "username").unwrap(), "alice");
    }

    #[test]
    fn split_csv_trims_and_drops_empties() {
        assert_eq!(split_csv(" general ,disaster,, weather"), vec!["general", "disaster", "weather"]);
    }
}
