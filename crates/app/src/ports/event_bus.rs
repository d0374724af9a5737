//! Event bus port: publish/subscribe for domain events.

use std::future::Future;

use miotac_domain::error::MiotError;
use miotac_domain::event::Event;

/// Publishes domain events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), MiotError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), MiotError>> + Send {
        (**self).publish(event)
    }
}
