//! JSON handlers for entities.

use axum::Json;
use axum::extract::{Path, State};

use miotac_app::ports::Integration;
use miotac_domain::entity::Entity;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/entities`
pub async fn list<I: Integration>(State(state): State<AppState<I>>) -> Json<Vec<Entity>> {
    Json(state.integration.entities())
}

/// `GET /api/entities/{entity_id}`
pub async fn get<I: Integration>(
    State(state): State<AppState<I>>,
    Path(entity_id): Path<String>,
) -> Result<Json<Entity>, ApiError> {
    let entity = state.integration.entity(&entity_id)?;
    Ok(Json(entity))
}
