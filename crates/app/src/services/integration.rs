//! Integration lifecycle: set up, retry, unload and remove config entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use miotac_domain::config_entry::{ConfigEntry, EntryData};
use miotac_domain::device::{DOMAIN, DeviceDescriptor};
use miotac_domain::entity::Entity;
use miotac_domain::error::{DeviceError, MiotError, NotFoundError};
use miotac_domain::event::{Event, EventType};
use miotac_domain::id::EntryId;
use miotac_domain::service::{ServiceCall, ServiceResult};

use crate::entities::{ClimateEntity, SwitchEntity};
use crate::polling::{PollScheduler, UpdateCoordinator, spawn_state_publisher};
use crate::ports::{ConfigEntryRepository, DeviceConnector, EventPublisher, Integration};
use crate::services::config_flow::{ConfigFlow, FlowResult, UserInput};
use crate::services::probe::{ERROR_PLATFORM_NOT_READY, ProbeError, check_device};
use crate::services::registry::{DeviceRegistry, RegisteredDevice};

/// Timing of background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationSettings {
    /// Period of every poller.
    pub scan_interval: Duration,
    /// Delay before setting up an entry again after it was not ready.
    pub setup_retry: Duration,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
            setup_retry: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// The unit did not answer; setting up again later may succeed.
    #[error("device is not ready")]
    NotReady(#[source] DeviceError),
    /// Terminal: the unit will never be supported.
    #[error("unsupported device model {0}")]
    Unsupported(String),
}

impl From<ProbeError> for SetupError {
    fn from(error: ProbeError) -> Self {
        match error {
            ProbeError::Offline(source) => Self::NotReady(source),
            ProbeError::Unsupported(model) => Self::Unsupported(model),
        }
    }
}

struct Inner<C: DeviceConnector, R, P> {
    connector: C,
    repo: R,
    publisher: Arc<P>,
    registry: DeviceRegistry<C::Device>,
    settings: IntegrationSettings,
    retries: Mutex<HashMap<EntryId, JoinHandle<()>>>,
    /// Imports waiting for their unit, by host.
    imports: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// The integration: owns the device registry and drives the lifecycle of
/// every config entry. Cheap to clone.
pub struct MiotIntegration<C: DeviceConnector, R, P> {
    inner: Arc<Inner<C, R, P>>,
}

impl<C: DeviceConnector, R, P> Clone for MiotIntegration<C, R, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, R, P> MiotIntegration<C, R, P>
where
    C: DeviceConnector,
    R: ConfigEntryRepository + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(connector: C, repo: R, publisher: Arc<P>, settings: IntegrationSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                repo,
                publisher,
                registry: DeviceRegistry::new(),
                settings,
                retries: Mutex::new(HashMap::new()),
                imports: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry<C::Device> {
        &self.inner.registry
    }

    fn retries(&self) -> MutexGuard<'_, HashMap<EntryId, JoinHandle<()>>> {
        self.inner
            .retries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn imports(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.inner
            .imports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Probe the unit of `entry`, build its entities, fetch once and start
    /// polling.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::NotReady`] when the unit is offline and
    /// [`SetupError::Unsupported`] for a model outside the allow-list.
    #[tracing::instrument(skip_all, fields(entry_id = %entry.entry_id, host = %entry.data.host))]
    pub async fn setup_entry(&self, entry: &ConfigEntry) -> Result<(), SetupError> {
        let data = &entry.data;
        let device = Arc::new(self.inner.connector.connect(&data.host, &data.token));
        let probe = check_device(&device, &data.host).await?;
        let descriptor = DeviceDescriptor::new(&entry.unique_id, &probe.info);

        let climate = Arc::new(ClimateEntity::new(
            &data.name,
            &entry.unique_id,
            Arc::clone(&device),
            descriptor.clone(),
            data.retries,
        ));
        climate.request_refresh().await;

        let coordinator = Arc::new(UpdateCoordinator::new(
            format!("{} switches", data.name),
            Arc::clone(&device),
            data.retries,
        ));
        coordinator.request_refresh().await;
        let switches: Vec<_> =
            SwitchEntity::all(&data.name, &entry.unique_id, &coordinator, &descriptor)
                .into_iter()
                .map(Arc::new)
                .collect();

        let mut scheduler = PollScheduler::new();
        let period = self.inner.settings.scan_interval;
        scheduler.schedule(Arc::clone(&climate), period);
        scheduler.schedule(Arc::clone(&coordinator), period);
        let view = Arc::clone(&climate);
        scheduler.attach(spawn_state_publisher(
            climate.state().subscribe(),
            Arc::clone(&self.inner.publisher),
            move || view.to_entity().into_iter().collect(),
        ));
        let views = switches.clone();
        scheduler.attach(spawn_state_publisher(
            coordinator.subscribe(),
            Arc::clone(&self.inner.publisher),
            move || views.iter().filter_map(|s| s.to_entity().ok()).collect(),
        ));

        self.inner.registry.insert(RegisteredDevice::new(
            entry.entry_id,
            entry.unique_id.clone(),
            climate,
            coordinator,
            switches,
            scheduler,
        ));
        tracing::info!(unique_id = %entry.unique_id, title = %entry.title, "device set up");
        Ok(())
    }

    /// Set up `entry`, retrying in the background while the unit is not
    /// ready. Unsupported units are logged and left alone.
    pub async fn setup_or_retry(&self, entry: ConfigEntry) {
        match self.setup_entry(&entry).await {
            Ok(()) => {}
            Err(SetupError::Unsupported(model)) => {
                tracing::error!(entry_id = %entry.entry_id, model = %model, "device model is not supported, giving up");
            }
            Err(SetupError::NotReady(error)) => {
                tracing::warn!(
                    entry_id = %entry.entry_id,
                    error = %error,
                    retry_in = ?self.inner.settings.setup_retry,
                    "device not ready, will retry"
                );
                self.spawn_retry(entry);
            }
        }
    }

    fn spawn_retry(&self, entry: ConfigEntry) {
        let this = self.clone();
        let entry_id = entry.entry_id;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(this.inner.settings.setup_retry).await;
                match this.setup_entry(&entry).await {
                    Err(SetupError::NotReady(error)) => {
                        tracing::debug!(entry_id = %entry.entry_id, error = %error, "device still not ready");
                    }
                    Err(SetupError::Unsupported(model)) => {
                        tracing::error!(entry_id = %entry.entry_id, model = %model, "device model is not supported, giving up");
                        break;
                    }
                    Ok(()) => break,
                }
            }
            this.retries().remove(&entry.entry_id);
        });
        if let Some(previous) = self.retries().insert(entry_id, handle) {
            previous.abort();
        }
    }

    /// Set up every persisted entry. Returns how many entries were found.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the entries cannot be loaded.
    pub async fn setup_all(&self) -> Result<usize, MiotError> {
        let entries = self.inner.repo.get_all().await?;
        let count = entries.len();
        for entry in entries {
            self.setup_or_retry(entry).await;
        }
        tracing::info!(entries = count, devices = self.inner.registry.len(), "config entries loaded");
        Ok(count)
    }

    /// Stop polling and forget the devices of `entry_id`. Returns whether
    /// anything was running.
    pub fn unload_entry(&self, entry_id: EntryId) -> bool {
        let retry = self.retries().remove(&entry_id);
        if let Some(retry) = &retry {
            retry.abort();
        }
        let removed = self.inner.registry.remove(entry_id).is_some();
        if removed {
            tracing::info!(entry_id = %entry_id, "config entry unloaded");
        }
        removed || retry.is_some()
    }

    /// Unload and delete a config entry.
    ///
    /// # Errors
    ///
    /// Returns [`MiotError::NotFound`] when no entry has `entry_id`, or a
    /// storage error.
    pub async fn remove_entry(&self, entry_id: EntryId) -> Result<(), MiotError> {
        let entry = self
            .inner
            .repo
            .get_by_id(entry_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "ConfigEntry",
                id: entry_id.to_string(),
            })?;
        self.unload_entry(entry_id);
        self.inner.repo.delete(entry_id).await?;
        self.publish(EventType::EntryRemoved, &entry).await;
        Ok(())
    }

    /// Import settings from outside the flow (the daemon's device list).
    /// A created entry is set up right away. When the unit does not answer,
    /// the import is attempted again every `setup_retry` until it resolves.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository.
    pub async fn import_entry(&self, data: EntryData) -> Result<FlowResult, MiotError> {
        let result = self.try_import(data.clone()).await?;
        if matches!(
            result,
            FlowResult::Abort {
                reason: ERROR_PLATFORM_NOT_READY
            }
        ) {
            tracing::warn!(
                host = %data.host,
                retry_in = ?self.inner.settings.setup_retry,
                "device not ready, will retry import"
            );
            self.spawn_import_retry(data);
        }
        Ok(result)
    }

    async fn try_import(&self, data: EntryData) -> Result<FlowResult, MiotError> {
        let result = ConfigFlow::new(&self.inner.connector, &self.inner.repo)
            .step_import(data)
            .await?;
        self.after_flow(&result).await;
        Ok(result)
    }

    fn spawn_import_retry(&self, data: EntryData) {
        let this = self.clone();
        let host = data.host.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(this.inner.settings.setup_retry).await;
                match this.try_import(data.clone()).await {
                    Ok(FlowResult::Abort {
                        reason: ERROR_PLATFORM_NOT_READY,
                    }) => {
                        tracing::debug!(host = %data.host, "device still not ready");
                    }
                    Ok(FlowResult::CreateEntry { entry }) => {
                        tracing::info!(host = %data.host, entry_id = %entry.entry_id, "device imported");
                        break;
                    }
                    Ok(FlowResult::Abort { reason }) => {
                        tracing::info!(host = %data.host, reason, "device not imported");
                        break;
                    }
                    Ok(FlowResult::ShowForm { errors, .. }) => {
                        tracing::warn!(host = %data.host, ?errors, "device settings rejected");
                        break;
                    }
                    Err(error) => {
                        tracing::error!(host = %data.host, error = %error, "failed to import device, giving up");
                        break;
                    }
                }
            }
            this.imports().remove(&data.host);
        });
        if let Some(previous) = self.imports().insert(host, handle) {
            previous.abort();
        }
    }

    /// Run the "user" flow step. A created entry is set up right away.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository.
    pub async fn config_flow_user(&self, input: Option<UserInput>) -> Result<FlowResult, MiotError> {
        let result = ConfigFlow::new(&self.inner.connector, &self.inner.repo)
            .step_user(input)
            .await?;
        self.after_flow(&result).await;
        Ok(result)
    }

    async fn after_flow(&self, result: &FlowResult) {
        if let FlowResult::CreateEntry { entry } = result {
            self.publish(EventType::EntryCreated, entry).await;
            self.setup_or_retry(entry.clone()).await;
        }
    }

    async fn publish(&self, event_type: EventType, entry: &ConfigEntry) {
        let event = Event::new(
            event_type,
            None,
            serde_json::json!({
                "entry_id": entry.entry_id,
                "unique_id": entry.unique_id,
                "title": entry.title,
            }),
        );
        if let Err(error) = self.inner.publisher.publish(event).await {
            tracing::warn!(error = %error, "failed to publish entry event");
        }
    }

    /// Abort pending retries and stop every device.
    pub fn shutdown(&self) {
        let mut pending: Vec<_> = self.retries().drain().map(|(_, handle)| handle).collect();
        pending.extend(self.imports().drain().map(|(_, handle)| handle));
        for task in pending {
            task.abort();
        }
        self.inner.registry.clear();
        tracing::info!("integration stopped");
    }
}

impl<C, R, P> Integration for MiotIntegration<C, R, P>
where
    C: DeviceConnector,
    R: ConfigEntryRepository + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    fn domain(&self) -> &'static str {
        DOMAIN
    }

    fn entities(&self) -> Vec<Entity> {
        self.inner.registry.entities()
    }

    fn entity(&self, entity_id: &str) -> Result<Entity, MiotError> {
        self.inner.registry.entity(entity_id).ok_or_else(|| {
            NotFoundError {
                entity: "Entity",
                id: entity_id.to_string(),
            }
            .into()
        })
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> Result<Vec<ServiceResult>, MiotError> {
        let call = ServiceCall::parse(domain, service, &data)?;
        self.inner.registry.call_service(&call).await
    }

    async fn config_entries(&self) -> Result<Vec<ConfigEntry>, MiotError> {
        self.inner.repo.get_all().await
    }

    async fn remove_entry(&self, entry_id: EntryId) -> Result<(), MiotError> {
        MiotIntegration::remove_entry(self, entry_id).await
    }

    async fn config_flow_user(&self, input: Option<UserInput>) -> Result<FlowResult, MiotError> {
        MiotIntegration::config_flow_user(self, input).await
    }

    fn shutdown(&self) {
        MiotIntegration::shutdown(self);
    }
}
