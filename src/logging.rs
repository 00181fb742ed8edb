//! Process-wide tracing subscriber for the `semnotes` binary.
//!
//! Command output owns stdout, so console logs are written to stderr. A second layer appends
//! plain-text logs to `SEMNOTES_LOG_FILE` (default `logs/semnotes.log`) through a
//! non-blocking writer, keeping ingestion workers off the file I/O path.
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "SEMNOTES_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "logs/semnotes.log";
const DEFAULT_FILTER: &str = "info";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// When the log file cannot be opened only the stderr layer is installed.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    let file_layer = file_writer(&log_file_path(std::env::var(LOG_FILE_ENV).ok())).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

/// Resolve the log file from the environment override, ignoring blank values.
fn log_file_path(configured: Option<String>) -> PathBuf {
    configured
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

fn file_writer(path: &Path) -> Option<NonBlocking> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name()?.to_str()?;
    if let Err(error) = std::fs::create_dir_all(directory) {
        eprintln!("semnotes: cannot create log directory {}: {error}", directory.display());
        return None;
    }

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
    {
        Ok(appender) => appender,
        Err(error) => {
            eprintln!("semnotes: cannot open log file {}: {error}", path.display());
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    Some(writer)
}
