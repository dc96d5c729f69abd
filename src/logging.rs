//! Logging setup for gridwork.
//!
//! Console output goes to stderr so command output on stdout stays clean.
//! When file logging is on, two daily rolling files are kept in the platform
//! data directory:
//!
//! - `gridwork.<date>.log`: everything the env filter lets through
//! - `error.<date>.log`: warnings and errors only
//!
//! ```no_run
//! gridwork::logging::init(true)?;
//! tracing::info!("started");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/gridwork/logs`
/// - macOS: `~/Library/Application Support/gridwork/logs`
/// - Linux: `~/.local/share/gridwork/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("gridwork").join("logs"))
}

fn appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} file appender"))
}

/// Install the global subscriber.
///
/// Default level is `warn` on the console and `info` in files; `RUST_LOG`
/// overrides both.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or a file appender
/// fails.
pub fn init(to_file: bool) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(console_filter);

    let (all_logs_layer, error_logs_layer) = if to_file {
        let log_dir = get_log_dir()?;
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let file_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .context("Failed to create env filter")?;

        let all_logs = fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .with_writer(appender(&log_dir, "gridwork")?)
            .with_filter(file_filter);

        let errors = fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .with_writer(appender(&log_dir, "error")?)
            .with_filter(EnvFilter::new("warn"));

        (Some(all_logs), Some(errors))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(to_file, "Logging initialized");
    Ok(())
}

/// Gets the path to the current log file
pub fn get_current_log_path() -> Result<PathBuf> {
    let log_dir = get_log_dir()?;
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    Ok(log_dir.join(format!("gridwork.{today}.log")))
}
