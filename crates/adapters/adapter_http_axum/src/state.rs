//! Shared application state for axum handlers.

use std::sync::Arc;

use miotac_app::event_bus::InProcessEventBus;
use miotac_app::ports::Integration;

/// Application state shared across all axum handlers.
///
/// Generic over the integration to avoid dynamic dispatch. `Clone` is
/// implemented manually so that `I` itself does not need to be `Clone`.
pub struct AppState<I> {
    pub integration: Arc<I>,
    /// Bus the SSE endpoint subscribes to.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<I> Clone for AppState<I> {
    fn clone(&self) -> Self {
        Self {
            integration: Arc::clone(&self.integration),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<I: Integration> AppState<I> {
    #[must_use]
    pub fn new(integration: Arc<I>, event_bus: Arc<InProcessEventBus>) -> Self {
        Self {
            integration,
            event_bus,
        }
    }
}
