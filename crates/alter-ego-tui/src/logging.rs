//! File-based logging initialization
//!
//! The terminal is owned by the TUI, so all tracing output goes to a daily
//! rolling file instead of stdout/stderr.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_NAME: &str = "alter-ego.log";
const DEFAULT_FILTER: &str = "alter_ego=info,alter_ego_core=info";

/// Default log directory: `<cache dir>/alter-ego/logs`
pub fn default_log_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("alter-ego").join("logs"))
}

/// Initialize the logging system
///
/// `RUST_LOG` overrides the default filter. The returned guard flushes
/// buffered lines when dropped, so keep it alive for the whole run.
pub fn init(log_dir: Option<PathBuf>) -> Result<WorkerGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_ansi(false); // No ANSI codes in log files

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(log_dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}
