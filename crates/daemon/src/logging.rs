//! Subscriber setup for the binary
//!
//! `RUST_LOG` wins over the configured level when set.

use crate::config::{LogFormat, LogSettings};
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the background writer.
pub fn init(settings: &LogSettings) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&settings.level)))
        .with_context(|| format!("Invalid log level: {}", settings.level))?;

    let (writer, guard) = writer_for(&settings.target)?;

    let layer = match settings.format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        // Development: pretty formatting, colors only on a terminal
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(matches!(settings.target.as_str(), "stdout" | "stderr"))
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn default_directive(level: &str) -> String {
    format!("robot_master={}", level.trim().to_lowercase())
}

fn writer_for(target: &str) -> Result<(NonBlocking, WorkerGuard)> {
    match target {
        "stdout" => Ok(tracing_appender::non_blocking(std::io::stdout())),
        "stderr" => Ok(tracing_appender::non_blocking(std::io::stderr())),
        path => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log target is not a file: {}", path.display()))?;

            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            Ok(tracing_appender::non_blocking(appender))
        }
    }
}
