use hazard::{ClickOutcome, GameResult, GameSession, Point, SessionError};
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Session actor closed")]
    ActorClosed,
}

/// Externally writable session fields. Everything else only changes
/// through clicks and timeouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionPatch {
    #[serde(default)]
    pub current_image_index: Option<usize>,
    #[serde(default)]
    pub time_remaining: Option<u32>,
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub enum SessionCommand {
    Click {
        point: Point,
        reply: oneshot::Sender<Result<ClickOutcome, ManagerError>>,
    },
    Timeout {
        reply: oneshot::Sender<Result<GameResult, ManagerError>>,
    },
    Update {
        patch: SessionPatch,
        reply: oneshot::Sender<Result<GameSession, ManagerError>>,
    },
    GetSnapshot {
        reply: oneshot::Sender<GameSession>,
    },
    Shutdown,
}
