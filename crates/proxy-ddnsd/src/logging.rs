//! Console and file logging
//!
//! Both layers share one `EnvFilter`. `RUST_LOG`, when set, wins over the
//! configured level.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Map a configured level to an `EnvFilter` directive
///
/// Accepts the `warning` and `critical` spellings found in older config files.
pub fn filter_directive(level: &str) -> String {
    match level.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop; keep it until exit.
pub fn init(level: &str, log_file: &Path) -> Result<WorkerGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(level))
            .with_context(|| format!("Invalid log level '{}'", level))?,
    };

    let file_name = log_file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Log file path has no usable file name: {}", log_file.display()))?;
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(guard)
}
