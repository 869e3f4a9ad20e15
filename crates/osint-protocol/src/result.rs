use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque result payload delivered worker -> dispatcher -> subscribed
/// client(s). The dispatcher never parses `result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub task_id: String,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}
