//! Collector-facing surface: `RegisterCollector`, `LoginCollector`,
//! `Heartbeat`, `SubmitTaskResult`, and the `StreamTasks` SSE route.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use osint_json_rpc::RequestId;
use osint_protocol::TaskAssignment;
use serde_json::{json, Value};
use tokio_stream::Stream;

use crate::error::{OsintClientError, OsintClientResult};
use crate::{rpc, sse};

pub struct CollectorClient {
    http: reqwest::Client,
    base_url: String,
    next_id: AtomicI64,
}

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

impl CollectorClient {
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

    pub async fn register_collector(&self, name: &str, secret: &str) -> OsintClientResult<Ack> {
        let mut params = HashMap::new();
        params.insert("name".to_string(), json!(name));
        params.insert("secret".to_string(), json!(secret));

        let result = self.call("RegisterCollector", params).await?;
        Ok(Ack { success: bool_field(&result, "success"), message: string_field(&result, "message") })
    }

    pub async fn login_collector(&self, name: &str, secret: &str) -> OsintClientResult<LoginOutcome> {
        let mut params = HashMap::new();
        params.insert("name".to_string(), json!(name));
        params.insert("secret".to_string(), json!(secret));

        let result = self.call("LoginCollector", params).await?;
        Ok(LoginOutcome {
            success: bool_field(&result, "success"),
            message: string_field(&result, "message"),
            token: string_field(&result, "token"),
        })
    }

    pub async fn heartbeat(&self, token: &str) -> OsintClientResult<Ack> {
        let mut params = HashMap::new();
        params.insert("token".to_string(), json!(token));

        let result = self.call("Heartbeat", params).await?;
        Ok(Ack { success: bool_field(&result, "success"), message: string_field(&result, "message") })
    }

    pub async fn submit_task_result(
        &self,
        token: &str,
        task_id: &str,
        result: Value,
        timestamp: Option<DateTime<Utc>>,
    ) -> OsintClientResult<Ack> {
        let mut params = HashMap::new();
        params.insert("token".to_string(), json!(token));
        params.insert("task_id".to_string(), json!(task_id));
        params.insert("result".to_string(), result);
        if let Some(timestamp) = timestamp {
            params.insert("timestamp".to_string(), json!(timestamp.to_rfc3339()));
        }

        let response = self.call("SubmitTaskResult", params).await?;
        Ok(Ack { success: bool_field(&response, "success"), message: string_field(&response, "message") })
    }

    /// Opens `GET /stream/tasks` and decodes each [`TaskAssignment`] as it
    /// is pushed, until the worker is removed from the fleet.
    pub async fn stream_tasks(
        &self,
        token: &str,
    ) -> OsintClientResult<impl Stream<Item = Result<TaskAssignment, OsintClientError>>> {
        let url = format!("{}/stream/tasks?token={token}", self.base_url);
        let response = self.http.get(url).header("accept", "text/event-stream").send().await?.error_for_status()?;
        Ok(sse::decode_events(response))
    }
}

fn bool_field(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}
