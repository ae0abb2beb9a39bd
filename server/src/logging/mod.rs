//! Logging setup
//!
//! Everything goes to stderr so the stdio transport keeps stdout for
//! protocol frames. Pretty output on a terminal, JSON otherwise, plus an
//! optional JSON log file.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Map a config level name to a tracing level, defaulting to INFO
pub fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize the tracing subscriber
pub fn init_logging(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let level = parse_level(log_level);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("opsi_mcp={},opsi_cli={}", level, level)));

    let stderr_layer = if term::stderr_is_terminal() {
        fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json()
                    .with_writer(std::sync::Mutex::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

mod term {
    pub fn stderr_is_terminal() -> bool {
        #[cfg(unix)]
        {
            unsafe { libc::isatty(libc::STDERR_FILENO) != 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}
