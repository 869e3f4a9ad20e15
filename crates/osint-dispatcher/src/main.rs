//! Process entry point: argument parsing, config loading, logging setup,
//! and wiring of the process-wide [`osint_dispatcher_server::AppState`].
//! `tracing` output goes to stdout by default, or to a rolling file when
//! `log_file` is configured.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use osint_dispatcher_server::{AppState, DispatcherConfig};
use osint_source_catalog::SourceCatalog;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "osint-dispatcher")]
#[command(about = "Dispatcher core for the distributed OSINT collection platform")]
struct Args {
    /// Path to a TOML config file. Fields it omits fall back to
    /// `DispatcherConfig::default()`, so a config-less run still starts.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<DispatcherConfig, osint_protocol::OsintError> {
    match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                osint_protocol::OsintError::Internal(format!(
                    "could not read config file {}: {e}",
                    path.display()
                ))
            })?;
            DispatcherConfig::from_toml_str(&raw)
        }
        None => Ok(DispatcherConfig::default()),
    }
}

/// Initialises `tracing`. When `config.log_file` is set, logs go to that
/// file via a non-blocking rolling-never appender; the returned guard must
/// stay alive for the process lifetime or buffered log lines are lost on
/// exit. With no `log_file`, logs go to stdout.
fn setup_logging(config: &DispatcherConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_file {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("osint-dispatcher.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let _log_guard = setup_logging(&config);
    tracing::info!(
        client_addr = %config.client_addr(),
        collector_addr = %config.collector_addr(),
        persistent = config.persistent,
        "starting dispatcher"
    );

    let (tasks, users) = match osint_dispatcher_server::build_stores(&config).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize persistence layer");
            return std::process::ExitCode::FAILURE;
        }
    };

    let catalog = SourceCatalog::load(&config.sources_path);
    let state = Arc::new(AppState::new(config, tasks, users, catalog));

    if let Err(e) = osint_dispatcher_server::run(state).await {
        tracing::error!(error = %e, "dispatcher exited with an unrecoverable error");
        return std::process::ExitCode::FAILURE;
    }

    std::process::ExitCode::SUCCESS
}
