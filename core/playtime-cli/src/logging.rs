//! File logging for the CLI.
//!
//! Output goes to `~/.playtime/logs/playtime-cli.log.<date>` so that stdout
//! stays reserved for rendered replies. Logging is skipped entirely when the
//! home directory or the log directory is unavailable.

use fs_err as fs;
use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "playtime-cli.log";

fn log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".playtime").join("logs"))
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var("PLAYTIME_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// The returned guard must be held until exit or buffered lines are lost.
pub fn init() -> Option<WorkerGuard> {
    let dir = log_dir()?;
    if fs::create_dir_all(&dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
