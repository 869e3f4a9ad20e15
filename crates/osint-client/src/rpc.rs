//! Shared unary JSON-RPC call path for both client-facing and
//! collector-facing requests: one POST, one JSON body back, no session
//! headers or chunked-notification interleaving to handle.

use std::collections::HashMap;

use osint_json_rpc::{JsonRpcRequest, RequestId, RequestParams};
use serde_json::Value;

use crate::error::{OsintClientError, OsintClientResult};

pub async fn call(
    http: &reqwest::Client,
    rpc_url: &str,
    id: RequestId,
    method: &str,
    params: HashMap<String, Value>,
) -> OsintClientResult<Value> {
    let request = JsonRpcRequest::new(id, method.to_string(), Some(RequestParams::Object(params)));

    let response = http
        .post(rpc_url)
        .header("content-type", "application/json")
        .json(&request)
        .send()
        .await?
        .error_for_status()?;

    let body: Value = response.json().await?;

    if let Some(error) = body.get("error") {
        let error_object: osint_json_rpc::JsonRpcErrorObject = serde_json::from_value(error.clone())?;
        return Err(OsintClientError::rpc(error_object));
    }

    Ok(body.get("result").cloned().unwrap_or(Value::Null))
}
