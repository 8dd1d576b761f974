use hazard::{ClickOutcome, GameResult, GameSession, Point};
use tokio::sync::{mpsc, oneshot};

use super::commands::{ManagerError, SessionCommand, SessionPatch};

/// Cheap, cloneable handle to a session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True once the actor has stopped receiving commands.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    pub async fn click(&self, point: Point) -> Result<ClickOutcome, ManagerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Click { point, reply: tx }).await?;
        rx.await.map_err(|_| ManagerError::ActorClosed)?
    }

    pub async fn timeout(&self) -> Result<GameResult, ManagerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Timeout { reply: tx }).await?;
        rx.await.map_err(|_| ManagerError::ActorClosed)?
    }

    pub async fn update(&self, patch: SessionPatch) -> Result<GameSession, ManagerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Update { patch, reply: tx }).await?;
        rx.await.map_err(|_| ManagerError::ActorClosed)?
    }

    pub async fn get_snapshot(&self) -> Result<GameSession, ManagerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        rx.await.map_err(|_| ManagerError::ActorClosed)
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), ManagerError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| ManagerError::ActorClosed)
    }
}
