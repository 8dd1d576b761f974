//! Async repository trait definitions for the persistence layer.
//!
//! Each trait abstracts over one document collection, allowing both the
//! JSON-file and SQLite backends to be used interchangeably via static
//! dispatch (the session manager and HTTP state are generic over
//! [`Storage`]).
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, which axum handlers and
//! `tokio::spawn` require.

use super::PersistenceError;
use hazard::{GameConfig, GameImage, GameResult, GameSession, RiskZone};
use std::future::Future;

/// Repository for images and their risk zones.
pub trait ImageRepository: Send + Sync {
    fn save_image(
        &self,
        image: &GameImage,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_image(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<GameImage>, PersistenceError>> + Send;
    fn list_images(&self) -> impl Future<Output = Result<Vec<GameImage>, PersistenceError>> + Send;
    /// Returns `false` if there was nothing to delete.
    fn delete_image(&self, id: &str) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    /// Zones of one image in authoring order, or `None` if the image is gone.
    fn load_zones_for_image(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Vec<RiskZone>>, PersistenceError>> + Send {
        async move { Ok(self.load_image(id).await?.map(|image| image.risk_zones)) }
    }
}

/// Repository for game configurations.
pub trait GameRepository: Send + Sync {
    fn save_game(&self, game: &GameConfig)
        -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_game(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<GameConfig>, PersistenceError>> + Send;
    fn list_games(&self) -> impl Future<Output = Result<Vec<GameConfig>, PersistenceError>> + Send;
    fn delete_game(&self, id: &str) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
}

/// Repository for player sessions.
///
/// Callers serialize writes per session id; implementations only need
/// last-write-wins semantics for a single record.
pub trait SessionRepository: Send + Sync {
    fn save_session(
        &self,
        session: &GameSession,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_session(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<GameSession>, PersistenceError>> + Send;
}

/// Append-only repository for final results.
///
/// Implementations must reject a second result for the same session with
/// [`PersistenceError::DuplicateResult`].
pub trait ResultRepository: Send + Sync {
    fn append_result(
        &self,
        result: &GameResult,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    /// Most recent first.
    fn list_results(&self) -> impl Future<Output = Result<Vec<GameResult>, PersistenceError>> + Send;
    /// Most recent first.
    fn list_results_for_game(
        &self,
        game_id: &str,
    ) -> impl Future<Output = Result<Vec<GameResult>, PersistenceError>> + Send;
    fn load_result_for_session(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<GameResult>, PersistenceError>> + Send;
}

/// Everything the server needs from a backend.
pub trait Storage:
    ImageRepository + GameRepository + SessionRepository + ResultRepository + 'static
{
}

impl<T> Storage for T where
    T: ImageRepository + GameRepository + SessionRepository + ResultRepository + 'static
{
}
