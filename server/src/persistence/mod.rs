mod file_store;
mod json_store;
pub mod sqlite;
pub mod traits;

pub use file_store::FileStore;
pub use traits::{GameRepository, ImageRepository, ResultRepository, SessionRepository, Storage};

use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("A result already exists for session {0}")]
    DuplicateResult(String),
}

/// Generate a new record id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
