//! Client-facing surface: `Register`, `Login`, `StartTask`,
//! `ListAvailableCategories`, `ListAvailableLocations`, `CancelTask`, and
//! the `StreamResults` SSE route. One struct wrapping a `reqwest::Client`
//! plus a request-id counter; no session-initialisation handshake, since
//! this protocol has no equivalent of one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use osint_json_rpc::RequestId;
use osint_protocol::ResultEnvelope;
use serde_json::{json, Value};
use tokio_stream::Stream;

use crate::error::{OsintClientError, OsintClientResult};
use crate::{rpc, sse};

pub struct DispatcherClient {
    http: reqwest::Client,
    base_url: String,
    next_id: AtomicI64,
}

/// Outcome of `register`/`cancel_task`, which carry only a success flag
/// and a human-readable message.
#[derive(Debug, Clone)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub success: bool,
    pub message: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct StartTaskOutcome {
    pub success: bool,
    pub message: String,
    pub task_id: String,
}

impl DispatcherClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn rpc_url(&self) -> String {
        format!("{}/rpc", self.base_url)
    }

    async fn call(&self, method: &str, params: HashMap<String, Value>) -> OsintClientResult<Value> {
        rpc::call(&self.http, &self.rpc_url(), self.next_request_id(), method, params).await
    }

    pub async fn register(&self, username: &str, password: &str) -> OsintClientResult<Ack> {
        let mut params = HashMap::new();
        params.insert("username".to_string(), json!(username));
        params.insert("password".to_string(), json!(password));

        let result = self.call("Register", params).await?;
        parse_ack(result)
    }

    pub async fn login(&self, username: &str, password: &str) -> OsintClientResult<LoginOutcome> {
        let mut params = HashMap::new();
        params.insert("username".to_string(), json!(username));
        params.insert("password".to_string(), json!(password));

        let result = self.call("Login", params).await?;
        Ok(LoginOutcome {
            success: bool_field(&result, "success"),
            message: string_field(&result, "message"),
            token: string_field(&result, "token"),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn start_task(
        &self,
        token: &str,
        keywords: &str,
        categories: &str,
        location: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> OsintClientResult<StartTaskOutcome> {
        let mut params = HashMap::new();
        params.insert("token".to_string(), json!(token));
        params.insert("keywords".to_string(), json!(keywords));
        params.insert("categories".to_string(), json!(categories));
        params.insert("location".to_string(), json!(location));
        params.insert("start_time".to_string(), json!(start_time.to_rfc3339()));
        params.insert("end_time".to_string(), json!(end_time.to_rfc3339()));

        let result = self.call("StartTask", params).await?;
        Ok(StartTaskOutcome {
            success: bool_field(&result, "success"),
            message: string_field(&result, "message"),
            task_id: string_field(&result, "task_id"),
        })
    }

    pub async fn list_categories(&self) -> OsintClientResult<Vec<String>> {
        let result = self.call("ListAvailableCategories", HashMap::new()).await?;
        Ok(string_vec_field(&result, "categories"))
    }

    pub async fn list_locations(&self) -> OsintClientResult<Vec<String>> {
        let result = self.call("ListAvailableLocations", HashMap::new()).await?;
        Ok(string_vec_field(&result, "locations"))
    }

    pub async fn cancel_task(&self, token: &str, task_id: &str) -> OsintClientResult<Ack> {
        let mut params = HashMap::new();
        params.insert("token".to_string(), json!(token));
        params.insert("task_id".to_string(), json!(task_id));

        let result = self.call("CancelTask", params).await?;
        parse_ack(result)
    }

    /// Opens `GET /stream/results` and decodes each `ResultEnvelope` pushed
    /// for `task_id` until the dispatcher closes the task's queue.
    pub async fn stream_results(
        &self,
        token: &str,
        task_id: &str,
    ) -> OsintClientResult<impl Stream<Item = Result<ResultEnvelope, OsintClientError>>> {
        let url = format!("{}/stream/results?token={token}&task_id={task_id}", self.base_url);
        let response = self.http.get(url).header("accept", "text/event-stream").send().await?.error_for_status()?;
        Ok(sse::decode_events(response))
    }
}

fn parse_ack(value: Value) -> OsintClientResult<Ack> {
    Ok(Ack { success: bool_field(&value, "success"), message: string_field(&value, "message") })
}

fn bool_field(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn string_vec_field(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}
