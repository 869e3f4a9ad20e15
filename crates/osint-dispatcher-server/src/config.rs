use serde::Deserialize;

/// Process-wide configuration. Every field has a default so a config-less
/// run still starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub dispatcher_address: String,
    pub client_port: u16,
    pub collector_port: u16,
    pub db_path: String,
    pub user_db_path: String,
    pub sources_path: String,
    pub heartbeat_interval_secs: u64,
    pub heartbeat_timeout_secs: u64,
    pub sweeper_interval_secs: u64,
    pub stream_poll_interval_secs: u64,
    pub log_file: Option<String>,
    pub max_workers: usize,
    /// Use the sqlite-backed user/task stores instead of the in-memory
    /// defaults.
    pub persistent: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            dispatcher_address: "127.0.0.1".to_string(),
            client_port: 7800,
            collector_port: 7801,
            db_path: "osint_tasks.db".to_string(),
            user_db_path: "osint_users.db".to_string(),
            sources_path: "sources.json".to_string(),
            heartbeat_interval_secs: 10,
            heartbeat_timeout_secs: 30,
            sweeper_interval_secs: 5,
            stream_poll_interval_secs: 5,
            log_file: None,
            max_workers: 64,
            persistent: false,
        }
    }
}

impl DispatcherConfig {
    /// Loads a config from a TOML file, falling back to `Default` for any
    /// field the file omits. A missing file is not an error; callers that
    /// want a hard failure on a missing path should check existence first.
    pub fn from_toml_str(raw: &str) -> Result<Self, osint_protocol::OsintError> {
        toml::from_str(raw)
            .map_err(|e| osint_protocol::OsintError::InvalidArgument(format!("malformed config: {e}")))
    }

    pub fn client_addr(&self) -> String {
        format!("{}:{}", self.dispatcher_address, self.client_port)
    }

    pub fn collector_addr(&self) -> String {
        format!("{}:{}", self.dispatcher_address, self.collector_port)
    }

    pub fn heartbeat_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn sweeper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweeper_interval_secs)
    }

    pub fn stream_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.stream_poll_interval_secs)
    }
}
