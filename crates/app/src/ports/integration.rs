//! Integration port: what the outer surfaces (HTTP API, daemon) drive.
//!
//! Implemented by [`MiotIntegration`](crate::services::integration::MiotIntegration);
//! the HTTP adapter only ever sees this trait.

use std::future::Future;

use miotac_domain::config_entry::ConfigEntry;
use miotac_domain::entity::Entity;
use miotac_domain::error::MiotError;
use miotac_domain::id::EntryId;
use miotac_domain::service::ServiceResult;

use crate::services::config_flow::{FlowResult, UserInput};

pub trait Integration: Send + Sync + 'static {
    /// Integration domain, used as the device identifier namespace.
    fn domain(&self) -> &'static str;

    /// Every entity of every set-up device.
    fn entities(&self) -> Vec<Entity>;

    /// Look one entity up.
    ///
    /// Returns [`MiotError::NotFound`] for an unknown id.
    fn entity(&self, entity_id: &str) -> Result<Entity, MiotError>;

    /// Validate and dispatch a raw service call.
    ///
    /// Returns [`MiotError::Validation`] for an unknown service or invalid
    /// data and [`MiotError::NotFound`] when none of the named entities
    /// exists.
    fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> impl Future<Output = Result<Vec<ServiceResult>, MiotError>> + Send;

    fn config_entries(&self) -> impl Future<Output = Result<Vec<ConfigEntry>, MiotError>> + Send;

    /// Unload and delete a config entry.
    fn remove_entry(&self, entry_id: EntryId) -> impl Future<Output = Result<(), MiotError>> + Send;

    /// Run the "user" step of the config flow. A created entry is set up
    /// right away.
    fn config_flow_user(
        &self,
        input: Option<UserInput>,
    ) -> impl Future<Output = Result<FlowResult, MiotError>> + Send;

    /// Stop every background task.
    fn shutdown(&self);
}
