//! JSON HTTP API.

mod error;
mod games;
mod images;
mod results;
mod sessions;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::persistence::Storage;
use crate::session::SessionManager;
pub use error::ApiError;

/// Shared handler state.
pub struct AppState<S> {
    pub manager: Arc<SessionManager<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<S: Storage> AppState<S> {
    pub fn new(manager: Arc<SessionManager<S>>) -> Self {
        Self { manager }
    }

    fn store(&self) -> &S {
        self.manager.store().as_ref()
    }
}

/// Build the full router.
pub fn router<S: Storage>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/images", get(images::list::<S>).post(images::create::<S>))
        .route(
            "/api/images/{id}",
            get(images::get::<S>)
                .put(images::update::<S>)
                .delete(images::delete::<S>),
        )
        .route("/api/images/{id}/risk-zones", put(images::set_risk_zones::<S>))
        .route("/api/images/{id}/duplicate", post(images::duplicate::<S>))
        .route("/api/games", get(games::list::<S>).post(games::create::<S>))
        .route(
            "/api/games/{id}",
            get(games::get::<S>)
                .put(games::update::<S>)
                .delete(games::delete::<S>),
        )
        .route("/api/games/{id}/duplicate", post(games::duplicate::<S>))
        .route("/api/sessions", post(sessions::start::<S>))
        .route(
            "/api/sessions/{id}",
            get(sessions::get::<S>).put(sessions::update::<S>),
        )
        .route("/api/sessions/{id}/click", post(sessions::click::<S>))
        .route("/api/sessions/{id}/timeout", post(sessions::timeout::<S>))
        .route("/api/results", get(results::list::<S>))
        .route("/api/results/game/{game_id}", get(results::for_game::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
