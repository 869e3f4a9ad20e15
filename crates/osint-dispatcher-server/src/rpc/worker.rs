use async_trait::async_trait;
use chrono::Utc;
use osint_json_rpc::async_dispatch::{JsonRpcHandler, SessionContext};
use osint_json_rpc::RequestParams;
use osint_protocol::{OsintError, ResultEnvelope};
use serde_json::{json, Value};

use crate::rpc::params::{failure, optional_datetime, required_str, success};
use crate::state::SharedAppState;

/// Implements the worker-facing RPC methods:
/// `RegisterCollector`, `LoginCollector`, `Heartbeat`, `SubmitTaskResult`.
/// `StreamTasks` is served over its own SSE route (see `crate::server`).
pub struct CollectorRpcHandler {
    pub state: SharedAppState,
}

pub const COLLECTOR_METHODS: &[&str] =
    &["RegisterCollector", "LoginCollector", "Heartbeat", "SubmitTaskResult"];

#[async_trait]
impl JsonRpcHandler for CollectorRpcHandler {
    type Error = OsintError;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        _session_context: Option<SessionContext>,
    ) -> Result<Value, Self::Error> {
        match method {
            "RegisterCollector" => self.register_collector(params),
            "LoginCollector" => self.login_collector(params),
            "Heartbeat" => self.heartbeat(params),
            "SubmitTaskResult" => self.submit_task_result(params),
            other => Err(OsintError::Internal(format!("unrouted collector method '{other}'"))),
        }
    }

    fn supported_methods(&self) -> Vec<String> {
        COLLECTOR_METHODS.iter().map(|s| s.to_string()).collect()
    }
}

impl CollectorRpcHandler {
    fn register_collector(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let name = required_str(&params, "name")?;
        let secret = required_str(&params, "secret")?;

        match self.state.fleet.register(&name, &secret) {
            Ok(()) => Ok(success("registered")),
            Err(e) => Ok(failure(e.public_message())),
        }
    }

    fn login_collector(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let name = required_str(&params, "name")?;
        let secret = required_str(&params, "secret")?;

        match self.state.fleet.login(&name, &secret) {
            Ok(token) => Ok(json!({ "success": true, "message": "logged in", "token": token })),
            Err(e) => Ok(json!({ "success": false, "message": e.public_message(), "token": "" })),
        }
    }

    fn heartbeat(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let token = required_str(&params, "token")?;
        let at = optional_datetime(&params, "timestamp");

        match self.state.fleet.heartbeat(&token, at) {
            Ok(()) => Ok(success("heartbeat recorded")),
            Err(_) => Ok(failure("Invalid token")),
        }
    }

    fn submit_task_result(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let token = required_str(&params, "token")?;
        let task_id = required_str(&params, "task_id")?;
        let result = params
            .as_ref()
            .and_then(|p| p.get("result"))
            .cloned()
            .unwrap_or(Value::Null);
        let timestamp = optional_datetime(&params, "timestamp").unwrap_or_else(Utc::now);

        if let Err(_e) = self.state.fleet.record_result(&token, Some(timestamp)) {
            return Ok(failure("Invalid token"));
        }

        let caused_drop = self.state.results.push(
            &task_id,
            ResultEnvelope { task_id: task_id.clone(), result, timestamp },
        );

        let message = if caused_drop {
            "result enqueued, 1 prior result dropped for slow consumer".to_string()
        } else {
            "result enqueued".to_string()
        };
        Ok(success(message))
    }
}
