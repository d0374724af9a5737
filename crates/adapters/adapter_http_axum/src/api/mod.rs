//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod config_entries;
#[allow(clippy::missing_errors_doc)]
pub mod config_flow;
#[allow(clippy::missing_errors_doc)]
pub mod entities;
#[allow(clippy::missing_errors_doc)]
pub mod services;
pub mod sse;

use axum::Router;
use axum::routing::{delete, get, post};

use miotac_app::ports::Integration;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<I: Integration>() -> Router<AppState<I>> {
    Router::new()
        .route("/entities", get(entities::list::<I>))
        .route("/entities/{entity_id}", get(entities::get::<I>))
        .route("/services/{domain}/{service}", post(services::call::<I>))
        .route("/config_entries", get(config_entries::list::<I>))
        .route(
            "/config_entries/{entry_id}",
            delete(config_entries::remove::<I>),
        )
        .route(
            "/config_flow/user",
            get(config_flow::show::<I>).post(config_flow::submit::<I>),
        )
        .route("/events/stream", get(sse::stream::<I>))
}
