use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of a worker's counters, surfaced for operator
/// observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub name: String,
    pub assigned_task_count: usize,
    pub tasks_assigned_count: u64,
    pub tasks_completed_count: u64,
    pub heartbeat_count: u64,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub last_result_time: Option<DateTime<Utc>>,
}
