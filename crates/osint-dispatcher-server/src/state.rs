use std::sync::Arc;

use osint_fleet_registry::FleetRegistry;
use osint_result_bus::ResultBus;
use osint_source_catalog::SourceCatalog;
use osint_task_store::BoxedTaskStore;
use osint_user_store::BoxedUserStore;

use crate::auth::SharedAuthSessions;
use crate::config::DispatcherConfig;

/// Process-wide state, constructed once at startup and shared (via `Arc`)
/// by every RPC handler, the sweeper, and both HTTP listeners. Global state
/// is confined to the fleet registry, the task store connection, the
/// result bus map, and the config object — all constructed at startup, no
/// lazy globals.
pub struct AppState {
    pub config: DispatcherConfig,
    pub fleet: FleetRegistry,
    pub tasks: BoxedTaskStore,
    pub users: BoxedUserStore,
    pub results: ResultBus,
    pub catalog: SourceCatalog,
    pub auth_sessions: SharedAuthSessions,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: DispatcherConfig,
        tasks: BoxedTaskStore,
        users: BoxedUserStore,
        catalog: SourceCatalog,
    ) -> Self {
        Self {
            config,
            fleet: FleetRegistry::new(),
            tasks,
            users,
            results: ResultBus::new(),
            catalog,
            auth_sessions: Arc::new(crate::auth::AuthSessions::new()),
        }
    }
}
