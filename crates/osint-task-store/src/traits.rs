use async_trait::async_trait;
use chrono::{DateTime, Utc};
use osint_protocol::{OsintError, Task, TaskFilter, TaskStatus};

/// Backend-agnostic store of [`Task`] records. Status transitions always go
/// through `update_status` so they can be serialised per `task_id` even on
/// backends without cross-statement transactions.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a new task with status `PENDING` and `created_at ==
    /// updated_at == now`.
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        task_id: &str,
        owner_token: &str,
        keywords: &str,
        categories: &[String],
        locations: &[String],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Task, OsintError>;

    async fn update_status(&self, task_id: &str, new_status: TaskStatus) -> Result<(), OsintError>;

    async fn get(&self, task_id: &str) -> Result<Option<Task>, OsintError>;

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, OsintError>;

    async fn count(&self, statuses: Option<&[TaskStatus]>) -> Result<i64, OsintError>;

    /// Used by the Expiry Sweeper and by crash recovery.
    async fn list_pending_or_dispatched(&self) -> Result<Vec<Task>, OsintError>;
}

pub type BoxedTaskStore = std::sync::Arc<dyn TaskStore>;
