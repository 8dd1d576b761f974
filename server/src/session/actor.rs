use std::sync::Arc;
use std::time::Duration;

use hazard::{ClickOutcome, GameConfig, GameResult, GameSession, Point, SessionError};
use tokio::sync::mpsc;
use tracing::Instrument;

use super::commands::{ManagerError, SessionCommand, SessionPatch};
use super::Registry;
use crate::persistence::{now_timestamp, PersistenceError, Storage};

/// The main session actor loop.
///
/// Owns the in-memory copy of one session and applies commands strictly one
/// at a time. Every mutation is persisted before it becomes visible, so a
/// fresh actor loading the session from storage picks up where this one
/// stopped.
///
/// After `idle` without a command the actor removes itself from `registry`.
pub(crate) async fn run_session_actor<S: Storage>(
    session: GameSession,
    store: Arc<S>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    registry: Registry,
    idle: Duration,
) {
    let session_id = session.id().to_string();
    run_session_actor_inner(session, store, cmd_rx, registry, idle)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner<S: Storage>(
    mut session: GameSession,
    store: Arc<S>,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    registry: Registry,
    idle: Duration,
) {
    tracing::debug!("Session actor started");

    loop {
        match tokio::time::timeout(idle, cmd_rx.recv()).await {
            Ok(Some(SessionCommand::Shutdown)) | Ok(None) => {
                tracing::debug!("Session actor shutting down");
                break;
            }
            Ok(Some(cmd)) => handle_command(&mut session, store.as_ref(), cmd).await,
            Err(_) => {
                tracing::debug!("Session idle, stopping actor");
                // No replacement actor may load the session until the queue
                // is drained, so the registry stays locked throughout.
                let mut sessions = registry.write().await;
                cmd_rx.close();
                // Only a closed sender can be ours; a live one belongs to a
                // newer actor.
                if sessions.get(session.id()).is_some_and(|h| h.is_closed()) {
                    sessions.remove(session.id());
                }
                while let Some(cmd) = cmd_rx.recv().await {
                    handle_command(&mut session, store.as_ref(), cmd).await;
                }
                drop(sessions);
                break;
            }
        }
    }

    tracing::debug!("Session actor exited");
}

async fn handle_command<S: Storage>(session: &mut GameSession, store: &S, cmd: SessionCommand) {
    match cmd {
        SessionCommand::Click { point, reply } => {
            let result = click(session, store, point).await;
            let _ = reply.send(result);
        }
        SessionCommand::Timeout { reply } => {
            let result = timeout(session, store).await;
            let _ = reply.send(result);
        }
        SessionCommand::Update { patch, reply } => {
            let result = update(session, store, patch).await;
            let _ = reply.send(result);
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(session.clone());
        }
        SessionCommand::Shutdown => {}
    }
}

async fn load_game<S: Storage>(store: &S, game_id: &str) -> Result<GameConfig, ManagerError> {
    store
        .load_game(game_id)
        .await?
        .ok_or_else(|| ManagerError::NotFound("game", game_id.to_string()))
}

async fn click<S: Storage>(
    session: &mut GameSession,
    store: &S,
    point: Point,
) -> Result<ClickOutcome, ManagerError> {
    let game = load_game(store, session.game_id()).await?;
    let now = now_timestamp();

    if !session.is_active() {
        tracing::debug!(status = %session.status(), "Click on finished session ignored");
        let outcome = session.register_click(&game, &[], point, now);
        ensure_result(session, store, &game, now).await?;
        return Ok(outcome);
    }

    let image_id = game
        .image_at(session.current_image_index())
        .ok_or_else(|| {
            ManagerError::NotFound(
                "image",
                format!("index {} of game {}", session.current_image_index(), game.id),
            )
        })?
        .to_string();
    let zones = store
        .load_zones_for_image(&image_id)
        .await?
        .ok_or_else(|| ManagerError::NotFound("image", image_id.clone()))?;

    let mut next = session.clone();
    let outcome = next.register_click(&game, &zones, point, now);
    store.save_session(&next).await?;
    *session = next;

    tracing::debug!(
        hit = outcome.hit,
        clicks_used = outcome.clicks_used,
        score = outcome.score,
        "Click registered"
    );

    if let Some(result) = &outcome.result {
        tracing::info!(
            score = result.total_score,
            risks_found = result.total_risks_found,
            "Game completed"
        );
        append_result(store, result).await?;
    }

    Ok(outcome)
}

async fn timeout<S: Storage>(
    session: &mut GameSession,
    store: &S,
) -> Result<GameResult, ManagerError> {
    let game = load_game(store, session.game_id()).await?;
    let now = now_timestamp();

    let mut next = session.clone();
    match next.register_timeout(&game, now) {
        Ok(result) => {
            store.save_session(&next).await?;
            *session = next;
            tracing::info!(score = result.total_score, "Game timed out");
            append_result(store, &result).await?;
            Ok(result)
        }
        Err(SessionError::NotActive(_)) => ensure_result(session, store, &game, now).await,
        Err(e) => Err(e.into()),
    }
}

async fn update<S: Storage>(
    session: &mut GameSession,
    store: &S,
    patch: SessionPatch,
) -> Result<GameSession, ManagerError> {
    if !session.is_active() {
        return Err(SessionError::NotActive(session.status()).into());
    }

    let mut next = session.clone();
    if let Some(index) = patch.current_image_index {
        let game = load_game(store, session.game_id()).await?;
        next.select_image(&game, index)?;
    }
    if let Some(seconds) = patch.time_remaining {
        next.report_time_remaining(seconds)?;
    }

    if next != *session {
        store.save_session(&next).await?;
        *session = next;
    }
    Ok(session.clone())
}

/// Stored result of a finished session. A session that was saved as finished
/// but whose result never reached storage gets it rebuilt and appended.
async fn ensure_result<S: Storage>(
    session: &GameSession,
    store: &S,
    game: &GameConfig,
    now: u64,
) -> Result<GameResult, ManagerError> {
    if let Some(stored) = store.load_result_for_session(session.id()).await? {
        return Ok(stored);
    }
    let result = session
        .final_result(game, now)
        .ok_or(SessionError::NotActive(session.status()))?;
    tracing::warn!("Writing missing result for finished session");
    append_result(store, &result).await?;
    Ok(result)
}

/// A duplicate means the result is already stored, which is what the caller wants.
async fn append_result<S: Storage>(store: &S, result: &GameResult) -> Result<(), ManagerError> {
    match store.append_result(result).await {
        Ok(()) => Ok(()),
        Err(PersistenceError::DuplicateResult(session_id)) => {
            tracing::warn!(%session_id, "Result already stored");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
