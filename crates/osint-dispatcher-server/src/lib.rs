//! Expiry sweeper and client/worker RPC surface for the OSINT dispatcher,
//! built on a hyper JSON-RPC + SSE HTTP transport.

pub mod auth;
pub mod config;
pub mod rpc;
pub mod server;
pub mod sse;
pub mod state;
pub mod stream;
pub mod sweeper;

use std::sync::Arc;

use osint_json_rpc::async_dispatch::JsonRpcDispatcher;
use osint_protocol::OsintError;
use osint_task_store::{BoxedTaskStore, InMemoryTaskStore};
use osint_user_store::{BoxedUserStore, InMemoryUserStore};

pub use config::DispatcherConfig;
pub use state::{AppState, SharedAppState};

/// Builds the in-memory-backed store pair the dispatcher uses unless
/// `config.persistent` selects sqlite. Exposed separately from `run` so
/// tests can construct a server against a fixed `SharedAppState` without
/// going through sqlite at all.
pub async fn build_stores(
    config: &DispatcherConfig,
) -> Result<(BoxedTaskStore, BoxedUserStore), OsintError> {
    if config.persistent {
        let tasks: BoxedTaskStore = Arc::new(osint_task_store::SqliteTaskStore::new(&config.db_path).await?);
        let users: BoxedUserStore = Arc::new(osint_user_store::SqliteUserStore::new(&config.user_db_path).await?);
        Ok((tasks, users))
    } else {
        let tasks: BoxedTaskStore = Arc::new(InMemoryTaskStore::new());
        let users: BoxedUserStore = Arc::new(InMemoryUserStore::new());
        Ok((tasks, users))
    }
}

/// Wires a [`SharedAppState`] into the two RPC dispatchers (client-facing,
/// collector-facing) and runs everything forever: the Expiry Sweeper and
/// both HTTP listeners. Returns only on unrecoverable transport failure
/// (e.g. the configured port is already bound) — the caller (the
/// `osint-dispatcher` binary) turns that into a non-zero process exit.
pub async fn run(state: SharedAppState) -> std::io::Result<()> {
    let client_dispatcher = Arc::new(build_client_dispatcher(state.clone()));
    let collector_dispatcher = Arc::new(build_collector_dispatcher(state.clone()));

    let sweeper_state = state.clone();
    tokio::spawn(async move {
        sweeper::run(sweeper_state).await;
    });

    let client_state = state.clone();
    let client_server = tokio::spawn(async move { server::run_client_server(client_state, client_dispatcher).await });

    let collector_state = state.clone();
    let collector_server =
        tokio::spawn(async move { server::run_collector_server(collector_state, collector_dispatcher).await });

    tokio::select! {
        result = client_server => result.unwrap_or_else(|e| Err(std::io::Error::other(e.to_string()))),
        result = collector_server => result.unwrap_or_else(|e| Err(std::io::Error::other(e.to_string()))),
    }
}

fn build_client_dispatcher(state: SharedAppState) -> JsonRpcDispatcher<OsintError> {
    let mut dispatcher = JsonRpcDispatcher::new();
    let handler = rpc::ClientRpcHandler { state };
    dispatcher.register_methods(
        rpc::client::CLIENT_METHODS.iter().map(|s| s.to_string()).collect(),
        handler,
    );
    dispatcher
}

fn build_collector_dispatcher(state: SharedAppState) -> JsonRpcDispatcher<OsintError> {
    let mut dispatcher = JsonRpcDispatcher::new();
    let handler = rpc::CollectorRpcHandler { state };
    dispatcher.register_methods(
        rpc::worker::COLLECTOR_METHODS.iter().map(|s| s.to_string()).collect(),
        handler,
    );
    dispatcher
}
