pub mod cashflow;
pub mod charts;
pub mod customers;
pub mod dashboard;
pub mod errors;
pub mod gate;
pub mod metrics;
pub mod models;
pub mod mutation;
pub mod protocol;
pub mod resolver;
pub mod seed;
pub mod settings;
pub mod store;
pub mod tools;

use crate::dashboard::DashboardCore;
use crate::errors::{AppError, AppResult};
use crate::settings::{DashboardSettings, LoggingSettings};
use anyhow::Context;
use tokio::io::BufReader;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Load settings from `DASHBOARD_CONFIG`, then serve the line protocol on stdin/stdout.
pub async fn run() -> AppResult<()> {
    let settings = DashboardSettings::from_env()?;
    init_tracing(&settings.logging)?;

    let core = DashboardCore::new(settings);
    protocol::serve(&core, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Install the global subscriber. Stdout carries the protocol, so logs go to
/// a daily file when a directory is configured and to stderr otherwise.
pub fn init_tracing(logging: &LoggingSettings) -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let result = match &logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "dashboard.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(non_blocking);
            if logging.json {
                builder.json().try_init()
            } else {
                builder.with_ansi(false).try_init()
            }
        }
        None => {
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr);
            if logging.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
    };

    result.map_err(|error| AppError::Internal(format!("failed to install tracing subscriber: {}", error)))
}

pub fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
