use async_trait::async_trait;
use osint_json_rpc::async_dispatch::{JsonRpcHandler, SessionContext};
use osint_json_rpc::RequestParams;
use osint_protocol::{OsintError, TaskStatus};
use serde_json::{json, Value};

use crate::rpc::params::{failure, optional_str, required_datetime, required_str, split_csv, success};
use crate::state::SharedAppState;

/// Implements the client-facing RPC methods: `Register`, `Login`,
/// `StartTask`, `ListAvailableCategories`, `ListAvailableLocations`, and the
/// supplemental `CancelTask`. `StreamResults` is served over its own SSE
/// route (see `crate::server`), since a single JSON-RPC response can't
/// carry an open-ended stream of envelopes.
pub struct ClientRpcHandler {
    pub state: SharedAppState,
}

pub const CLIENT_METHODS: &[&str] = &[
    "Register",
    "Login",
    "StartTask",
    "ListAvailableCategories",
    "ListAvailableLocations",
    "CancelTask",
];

#[async_trait]
impl JsonRpcHandler for ClientRpcHandler {
    type Error = OsintError;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        _session_context: Option<SessionContext>,
    ) -> Result<Value, Self::Error> {
        match method {
            "Register" => self.register(params).await,
            "Login" => self.login(params).await,
            "StartTask" => self.start_task(params).await,
            "ListAvailableCategories" => self.list_categories().await,
            "ListAvailableLocations" => self.list_locations().await,
            "CancelTask" => self.cancel_task(params).await,
            other => Err(OsintError::Internal(format!("unrouted client method '{other}'"))),
        }
    }

    fn supported_methods(&self) -> Vec<String> {
        CLIENT_METHODS.iter().map(|s| s.to_string()).collect()
    }
}

impl ClientRpcHandler {
    async fn register(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let username = required_str(&params, "username")?;
        let password = required_str(&params, "password")?;

        match self.state.users.register(&username, &password).await {
            Ok(()) => Ok(success("registered")),
            Err(e) => Ok(failure(e.public_message())),
        }
    }

    async fn login(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let username = required_str(&params, "username")?;
        let password = required_str(&params, "password")?;

        let authenticated = self.state.users.authenticate(&username, &password).await?;
        if !authenticated {
            return Ok(json!({ "success": false, "message": "invalid credentials", "token": "" }));
        }

        let token = self.state.auth_sessions.issue(&username).await;
        Ok(json!({ "success": true, "message": "logged in", "token": token }))
    }

    async fn start_task(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let token = required_str(&params, "token")?;
        let keywords = optional_str(&params, "keywords");
        let categories = split_csv(&optional_str(&params, "categories"));
        let locations = split_csv(&optional_str(&params, "location"));
        let start_time = required_datetime(&params, "start_time")?;
        let end_time = required_datetime(&params, "end_time")?;

        if self.state.auth_sessions.username_for(&token).await.is_none() {
            return Ok(json!({ "success": false, "message": "invalid token", "task_id": "" }));
        }

        if start_time > end_time {
            return Ok(json!({
                "success": false,
                "message": "start_time must be <= end_time",
                "task_id": "",
            }));
        }

        let matched = self.state.catalog.match_sources(&categories, &locations);
        if matched.is_empty() {
            return Ok(json!({
                "success": false,
                "message": format!(
                    "no sources match categories={categories:?} locations={locations:?}"
                ),
                "task_id": "",
            }));
        }

        let task_id = uuid::Uuid::new_v4().simple().to_string();
        self.state
            .tasks
            .create(&task_id, &token, &keywords, &categories, &locations, start_time, end_time)
            .await?;

        let total = matched.len();
        let mut placed = 0usize;
        for source in &matched {
            match self.state.fleet.assign_balanced(
                &task_id,
                std::slice::from_ref(&source.id),
                end_time,
                self.state.config.heartbeat_timeout(),
            ) {
                Ok(_worker) => placed += 1,
                Err(e) => {
                    tracing::warn!(task_id = %task_id, source = %source.id, error = %e, "per-source assignment failed");
                }
            }
        }

        let new_status = if placed > 0 { TaskStatus::Dispatched } else { TaskStatus::Failed };
        self.state.tasks.update_status(&task_id, new_status).await?;

        Ok(json!({
            "success": placed > 0,
            "message": format!("placed {placed} of {total} sources"),
            "task_id": if placed > 0 { task_id } else { String::new() },
        }))
    }

    async fn list_categories(&self) -> Result<Value, OsintError> {
        self.state.catalog.reload();
        Ok(json!({ "categories": self.state.catalog.list_categories() }))
    }

    async fn list_locations(&self) -> Result<Value, OsintError> {
        self.state.catalog.reload();
        Ok(json!({ "locations": self.state.catalog.list_locations() }))
    }

    async fn cancel_task(&self, params: Option<RequestParams>) -> Result<Value, OsintError> {
        let token = required_str(&params, "token")?;
        let task_id = required_str(&params, "task_id")?;

        let Some(task) = self.state.tasks.get(&task_id).await? else {
            return Ok(failure("task not found"));
        };
        if task.owner_token != token {
            return Ok(failure("not authorized to cancel this task"));
        }
        if task.status.is_terminal() {
            return Ok(failure("task already in a terminal state"));
        }

        self.state.tasks.update_status(&task_id, TaskStatus::Cancelled).await?;
        self.state.results.close(&task_id);
        Ok(success("task cancelled"))
    }
}
