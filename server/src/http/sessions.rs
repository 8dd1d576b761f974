use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hazard::{ClickOutcome, GameResult, GameSession, Point};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::persistence::Storage;
use crate::session::{ManagerError, SessionPatch};

#[derive(Debug, Deserialize)]
pub struct StartSession {
    pub game_id: String,
    pub player_name: String,
    #[serde(default)]
    pub team_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub x: f64,
    pub y: f64,
}

pub async fn start<S: Storage>(
    State(state): State<AppState<S>>,
    payload: Result<Json<StartSession>, JsonRejection>,
) -> Result<(StatusCode, Json<GameSession>), ApiError> {
    let Json(body) = payload?;
    let session = state
        .manager
        .start_session(&body.game_id, &body.player_name, &body.team_name)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<GameSession>, ApiError> {
    Ok(Json(state.manager.get_session(&id).await?))
}

pub async fn update<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<SessionPatch>, JsonRejection>,
) -> Result<Json<GameSession>, ApiError> {
    let Json(patch) = payload?;
    Ok(Json(state.manager.update_session(&id, patch).await?))
}

pub async fn click<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<ClickRequest>, JsonRejection>,
) -> Result<Json<ClickOutcome>, ApiError> {
    let Json(body) = payload?;
    let point =
        Point::new(body.x, body.y).map_err(|e| ManagerError::InvalidInput(e.to_string()))?;
    Ok(Json(state.manager.handle_click(&id, point).await?))
}

pub async fn timeout<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<GameResult>, ApiError> {
    Ok(Json(state.manager.handle_timeout(&id).await?))
}
