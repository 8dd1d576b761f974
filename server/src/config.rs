//! Configuration for the hazard server.
//!
//! Every value has a compile-time default and can be overridden at runtime
//! via a dedicated environment variable. Command-line flags in `main` take
//! precedence over both.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::persistence::sqlite::SqliteSettings;

/// Default listen address for the HTTP API.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8001";

/// Fallback data directory when no platform directory can be resolved.
const DEV_DATA_DIR: &str = "./data";

/// Default idle period after which a session actor is stopped (in seconds).
const DEFAULT_SESSION_IDLE_SECS: u64 = 600;

/// An actor must live long enough to receive the command that spawned it.
const MIN_SESSION_IDLE_SECS: u64 = 1;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// Single SQLite database file.
    #[default]
    Sqlite,
    /// One JSON file per record.
    Json,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "json" => Ok(Backend::Json),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Get the data directory for persistence.
///
/// Priority:
/// 1. `HAZARD_DATA_DIR` env variable if set
/// 2. The platform data directory (e.g. `~/.local/share/hazard-hunt`)
/// 3. `./data` as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HAZARD_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "hazard-hunt") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Get the HTTP listen address.
///
/// Priority:
/// 1. `HAZARD_BIND_ADDR` env variable if set
/// 2. `127.0.0.1:8001` as fallback
pub fn get_bind_addr() -> String {
    std::env::var("HAZARD_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

/// Get the storage backend. Unrecognised values fall back to SQLite.
pub fn get_backend() -> Backend {
    match std::env::var("HAZARD_BACKEND") {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            tracing::warn!("{e}, using sqlite");
            Backend::Sqlite
        }),
        Err(_) => Backend::default(),
    }
}

/// Get the directory for rolling log files. `None` logs to stdout only.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("HAZARD_LOG_DIR").ok().map(PathBuf::from)
}

/// Get how long a session actor may sit idle before it is stopped.
///
/// Priority:
/// 1. `HAZARD_SESSION_IDLE_SECS` env variable if set to at least one second
/// 2. `600` seconds as fallback
pub fn get_session_idle() -> Duration {
    parse_session_idle(std::env::var("HAZARD_SESSION_IDLE_SECS").ok().as_deref())
}

fn parse_session_idle(value: Option<&str>) -> Duration {
    let secs = match value.map(|v| v.trim().parse::<u64>()) {
        None => DEFAULT_SESSION_IDLE_SECS,
        Some(Ok(secs)) if secs >= MIN_SESSION_IDLE_SECS => secs,
        Some(_) => {
            tracing::warn!(
                "HAZARD_SESSION_IDLE_SECS must be a whole number >= {MIN_SESSION_IDLE_SECS}, using {DEFAULT_SESSION_IDLE_SECS}"
            );
            DEFAULT_SESSION_IDLE_SECS
        }
    };
    Duration::from_secs(secs)
}

/// Get the SQLite pool settings.
///
/// `HAZARD_DB_MAX_CONNECTIONS` and `HAZARD_DB_BUSY_TIMEOUT_MS` override the
/// defaults; zero or unparsable values are ignored.
pub fn get_sqlite_settings() -> SqliteSettings {
    let mut settings = SqliteSettings::default();
    if let Some(n) = env_positive("HAZARD_DB_MAX_CONNECTIONS") {
        settings.max_connections = u32::try_from(n).unwrap_or(u32::MAX);
    }
    if let Some(ms) = env_positive("HAZARD_DB_BUSY_TIMEOUT_MS") {
        settings.busy_timeout = Duration::from_millis(ms);
    }
    settings
}

fn env_positive(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&n| n > 0)
}
