use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hazard::GameConfig;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::persistence::{generate_id, now_timestamp, Storage};

#[derive(Debug, Deserialize)]
pub struct CreateGame {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub time_limit: Option<u32>,
    pub max_clicks: Option<u32>,
    pub target_risks: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGame {
    pub name: Option<String>,
    pub description: Option<String>,
    pub time_limit: Option<u32>,
    pub max_clicks: Option<u32>,
    pub target_risks: Option<u32>,
    pub images: Option<Vec<String>>,
}

async fn load<S: Storage>(state: &AppState<S>, id: &str) -> Result<GameConfig, ApiError> {
    state
        .store()
        .load_game(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("game not found: {id}")))
}

/// Structural validation plus a check that every listed image exists.
async fn check<S: Storage>(state: &AppState<S>, game: &GameConfig) -> Result<(), ApiError> {
    game.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    for image_id in &game.images {
        if state.store().load_image(image_id).await?.is_none() {
            return Err(ApiError::BadRequest(format!("unknown image: {image_id}")));
        }
    }
    Ok(())
}

pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    payload: Result<Json<CreateGame>, JsonRejection>,
) -> Result<(StatusCode, Json<GameConfig>), ApiError> {
    let Json(body) = payload?;
    let mut game = GameConfig::new(generate_id(), body.name.trim(), now_timestamp());
    game.description = body.description;
    if let Some(limit) = body.time_limit {
        game.time_limit = limit;
    }
    if let Some(clicks) = body.max_clicks {
        game.max_clicks = clicks;
    }
    if let Some(target) = body.target_risks {
        game.target_risks = target;
    }
    game.images = body.images;

    check(&state, &game).await?;
    state.store().save_game(&game).await?;

    tracing::info!(game_id = %game.id, name = %game.name, "Game created");
    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<GameConfig>>, ApiError> {
    Ok(Json(state.store().list_games().await?))
}

pub async fn get<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<GameConfig>, ApiError> {
    Ok(Json(load(&state, &id).await?))
}

pub async fn update<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateGame>, JsonRejection>,
) -> Result<Json<GameConfig>, ApiError> {
    let Json(body) = payload?;
    let mut game = load(&state, &id).await?;

    if let Some(name) = body.name {
        game.name = name.trim().to_string();
    }
    if let Some(description) = body.description {
        game.description = description;
    }
    if let Some(limit) = body.time_limit {
        game.time_limit = limit;
    }
    if let Some(clicks) = body.max_clicks {
        game.max_clicks = clicks;
    }
    if let Some(target) = body.target_risks {
        game.target_risks = target;
    }
    if let Some(images) = body.images {
        game.images = images;
    }
    game.updated_at = now_timestamp();

    check(&state, &game).await?;
    state.store().save_game(&game).await?;
    Ok(Json(game))
}

pub async fn delete<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store().delete_game(&id).await? {
        tracing::info!(game_id = %id, "Game deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("game not found: {id}")))
    }
}

/// Copy a game under a new id. Images are shared, not copied.
pub async fn duplicate<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<GameConfig>), ApiError> {
    let source = load(&state, &id).await?;
    let now = now_timestamp();
    let copy = GameConfig {
        id: generate_id(),
        name: format!("{} (Copy)", source.name),
        created_at: now,
        updated_at: now,
        ..source
    };
    state.store().save_game(&copy).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}
