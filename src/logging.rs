//! Tracing setup for the service binary.
//!
//! Stdout always receives a compact layer. A second layer without ANSI colors writes to the
//! path in `LEXA_LOG_FILE`, to `logs/lexa-ai.log` when the variable is unset, and nowhere
//! when it is `off`.
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "LEXA_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "lexa-ai.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` controls filtering and defaults to `info`.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let file_layer = log_location(std::env::var(LOG_FILE_VAR).ok().as_deref())
        .and_then(|(dir, file)| file_writer(&dir, &file))
        .map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact()
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

/// Directory and file name for the log file, or `None` when file logging is off.
fn log_location(setting: Option<&str>) -> Option<(PathBuf, String)> {
    let setting = setting.map(str::trim).unwrap_or_default();
    if setting.eq_ignore_ascii_case("off") {
        return None;
    }
    if setting.is_empty() {
        return Some((PathBuf::from(DEFAULT_LOG_DIR), DEFAULT_LOG_FILE.to_string()));
    }

    let path = Path::new(setting);
    if setting.ends_with('/') {
        return Some((path.to_path_buf(), DEFAULT_LOG_FILE.to_string()));
    }
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, file))
}

/// Open an appending, never-rotating writer. Subscriber setup has not happened yet, so
/// failures go to stderr.
fn file_writer(dir: &Path, file: &str) -> Option<NonBlocking> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("Failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file)
        .build(dir)
    {
        Ok(appender) => appender,
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", dir.join(file).display());
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}
