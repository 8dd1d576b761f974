use axum::extract::{Path, State};
use axum::Json;
use hazard::GameResult;

use super::{ApiError, AppState};
use crate::persistence::Storage;

pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<GameResult>>, ApiError> {
    Ok(Json(state.store().list_results().await?))
}

pub async fn for_game<S: Storage>(
    State(state): State<AppState<S>>,
    Path(game_id): Path<String>,
) -> Result<Json<Vec<GameResult>>, ApiError> {
    Ok(Json(state.store().list_results_for_game(&game_id).await?))
}
