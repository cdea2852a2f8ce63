//! Tracing setup for the CLI. Logs go to stderr so stdout stays free for
//! command output.

use std::{env, sync::OnceLock};

use tracing_appender::{
    non_blocking,
    non_blocking::NonBlocking,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, Layer, fmt, fmt::time::ChronoLocal, prelude::*};

use crate::error::AppError;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Guard to ensure buffered logs are flushed on shutdown.
static LOG_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the level picked from `verbose`. `LOG_FORMAT=json`
/// switches stderr to JSON lines, `LOG_DIR` adds a daily rolling file.
pub fn init(verbose: bool) -> Result<(), AppError> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr = fmt::layer()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(false)
        .with_writer(std::io::stderr);
    let stderr = match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => stderr.json().boxed(),
        _ => stderr.boxed(),
    };

    let file = match env::var("LOG_DIR") {
        Ok(dir) => Some(
            fmt::layer()
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_ansi(false)
                .with_writer(file_writer(&dir)?),
        ),
        Err(_) => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|e| AppError::Config(format!("logger already initialized: {e}")))?;

    tracing::debug!(verbose, "logger initialized");
    Ok(())
}

fn file_writer(dir: &str) -> Result<NonBlocking, AppError> {
    let mut appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("aoe4-scout.log");

    if let Some(n) = env::var("LOG_MAX_FILES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
    {
        appender = appender.max_log_files(n);
    }

    let appender = appender
        .build(dir)
        .map_err(|e| AppError::Config(format!("cannot write logs to {dir}: {e}")))?;

    let (writer, guard) = non_blocking(appender);
    let _ = LOG_GUARD.set(guard);

    Ok(writer)
}
