use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hazard::{GameImage, RiskZone};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::persistence::{generate_id, now_timestamp, Storage};

#[derive(Debug, Deserialize)]
pub struct CreateImage {
    pub name: String,
    /// Base64 payload or URL; opaque to the server.
    #[serde(default)]
    pub image_data: String,
    #[serde(default)]
    pub risk_zones: Vec<RiskZone>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateImage {
    pub name: Option<String>,
    pub image_data: Option<String>,
}

async fn load<S: Storage>(state: &AppState<S>, id: &str) -> Result<GameImage, ApiError> {
    state
        .store()
        .load_image(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("image not found: {id}")))
}

pub async fn create<S: Storage>(
    State(state): State<AppState<S>>,
    payload: Result<Json<CreateImage>, JsonRejection>,
) -> Result<(StatusCode, Json<GameImage>), ApiError> {
    let Json(body) = payload?;
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("image name must not be empty".into()));
    }

    let now = now_timestamp();
    let mut image = GameImage::new(generate_id(), body.name.trim(), body.image_data, now);
    image
        .set_risk_zones(body.risk_zones, now)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.store().save_image(&image).await?;

    tracing::info!(image_id = %image.id, name = %image.name, "Image registered");
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<GameImage>>, ApiError> {
    Ok(Json(state.store().list_images().await?))
}

pub async fn get<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<GameImage>, ApiError> {
    Ok(Json(load(&state, &id).await?))
}

pub async fn update<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateImage>, JsonRejection>,
) -> Result<Json<GameImage>, ApiError> {
    let Json(body) = payload?;
    let mut image = load(&state, &id).await?;

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("image name must not be empty".into()));
        }
        image.name = name.trim().to_string();
    }
    if let Some(data) = body.image_data {
        image.image_data = data;
    }
    image.updated_at = now_timestamp();
    state.store().save_image(&image).await?;
    Ok(Json(image))
}

pub async fn delete<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store().delete_image(&id).await? {
        tracing::info!(image_id = %id, "Image deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("image not found: {id}")))
    }
}

/// Replace the whole zone set of an image.
pub async fn set_risk_zones<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<Vec<RiskZone>>, JsonRejection>,
) -> Result<Json<GameImage>, ApiError> {
    let Json(zones) = payload?;
    let mut image = load(&state, &id).await?;
    image
        .set_risk_zones(zones, now_timestamp())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.store().save_image(&image).await?;

    tracing::info!(image_id = %id, zones = image.risk_zones.len(), "Risk zones replaced");
    Ok(Json(image))
}

pub async fn duplicate<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<GameImage>), ApiError> {
    let source = load(&state, &id).await?;
    let copy = source.duplicate(generate_id(), now_timestamp());
    state.store().save_image(&copy).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}
