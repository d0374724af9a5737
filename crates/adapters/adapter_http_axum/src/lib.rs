//! # miotac-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** over the integration: entities, service calls,
//!   config entries and the config flow
//! - Stream domain events as **Server-Sent Events**
//! - Map HTTP requests into calls on the `Integration` port (driving adapter)
//! - Map application results and errors into HTTP responses
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | liveness |
//! | `GET /api/entities` | every entity of every set-up device |
//! | `GET /api/entities/{entity_id}` | one entity |
//! | `POST /api/services/{domain}/{service}` | dispatch a service call |
//! | `GET /api/config_entries` | configured devices, without tokens |
//! | `DELETE /api/config_entries/{entry_id}` | unload and forget a device |
//! | `GET`/`POST /api/config_flow/user` | the add-device form |
//! | `GET /api/events/stream` | SSE stream of the event bus |
//!
//! ## Dependency rule
//! Depends on `miotac-app` (for the `Integration` port and the event bus) and
//! `miotac-domain` (for domain types used in request/response mapping). Never
//! leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
