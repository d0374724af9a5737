//! Device registry: the entities of every set-up config entry, and service
//! dispatch over them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use miotac_domain::entity::Entity;
use miotac_domain::error::{MiotError, NotFoundError};
use miotac_domain::id::EntryId;
use miotac_domain::service::{ServiceAction, ServiceCall, ServiceResult};

use crate::entities::{ClimateEntity, SwitchEntity};
use crate::polling::{PollScheduler, UpdateCoordinator};
use crate::ports::MiotDevice;

/// Everything built for one config entry.
pub struct RegisteredDevice<D> {
    pub entry_id: EntryId,
    pub unique_id: String,
    pub climate: Arc<ClimateEntity<D>>,
    pub coordinator: Arc<UpdateCoordinator<D>>,
    pub switches: Vec<Arc<SwitchEntity<D>>>,
    scheduler: Mutex<PollScheduler>,
}

impl<D: MiotDevice> RegisteredDevice<D> {
    #[must_use]
    pub fn new(
        entry_id: EntryId,
        unique_id: impl Into<String>,
        climate: Arc<ClimateEntity<D>>,
        coordinator: Arc<UpdateCoordinator<D>>,
        switches: Vec<Arc<SwitchEntity<D>>>,
        scheduler: PollScheduler,
    ) -> Self {
        Self {
            entry_id,
            unique_id: unique_id.into(),
            climate,
            coordinator,
            switches,
            scheduler: Mutex::new(scheduler),
        }
    }

    /// Render the climate entity followed by the switches.
    ///
    /// An entity that fails to render is logged and skipped.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let rendered = std::iter::once(self.climate.to_entity())
            .chain(self.switches.iter().map(|switch| switch.to_entity()));
        rendered
            .filter_map(|entity| {
                entity
                    .inspect_err(|error| {
                        tracing::warn!(entry_id = %self.entry_id, error = %error, "failed to render entity");
                    })
                    .ok()
            })
            .collect()
    }

    /// Abort the background tasks of this device.
    pub fn stop(&self) {
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }

    /// Number of running background tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Registry of set-up devices, passed explicitly to whoever dispatches
/// service calls.
pub struct DeviceRegistry<D> {
    devices: Mutex<Vec<Arc<RegisteredDevice<D>>>>,
}

impl<D> Default for DeviceRegistry<D> {
    fn default() -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
        }
    }
}

impl<D: MiotDevice> DeviceRegistry<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<RegisteredDevice<D>>>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a device, replacing (and stopping) any previous registration
    /// of the same entry.
    pub fn insert(&self, device: RegisteredDevice<D>) {
        let replaced = {
            let mut devices = self.lock();
            let replaced = devices
                .iter()
                .position(|d| d.entry_id == device.entry_id)
                .map(|index| devices.remove(index));
            devices.push(Arc::new(device));
            replaced
        };
        if let Some(replaced) = replaced {
            replaced.stop();
        }
    }

    /// Unregister a device and stop its polling.
    pub fn remove(&self, entry_id: EntryId) -> Option<Arc<RegisteredDevice<D>>> {
        let removed = {
            let mut devices = self.lock();
            devices
                .iter()
                .position(|d| d.entry_id == entry_id)
                .map(|index| devices.remove(index))
        };
        if let Some(device) = &removed {
            device.stop();
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, entry_id: EntryId) -> bool {
        self.lock().iter().any(|d| d.entry_id == entry_id)
    }

    #[must_use]
    pub fn devices(&self) -> Vec<Arc<RegisteredDevice<D>>> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every entity of every device.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.devices()
            .iter()
            .flat_map(|device| device.entities())
            .collect()
    }

    #[must_use]
    pub fn entity(&self, entity_id: &str) -> Option<Entity> {
        self.entities()
            .into_iter()
            .find(|entity| entity.entity_id == entity_id)
    }

    /// Unregister every device and stop all polling.
    pub fn clear(&self) {
        let devices = std::mem::take(&mut *self.lock());
        for device in devices {
            device.stop();
        }
    }

    /// Dispatch a validated service call to the entities it targets.
    ///
    /// Climate calls without `entity_id` are broadcast to every device.
    /// An entity is refreshed after a successful command. After a failed one
    /// it stays unavailable until its next scheduled poll succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`MiotError::NotFound`] when the call names entities and none
    /// of them is registered.
    #[tracing::instrument(skip(self, call), fields(action = ?call.action))]
    pub async fn call_service(&self, call: &ServiceCall) -> Result<Vec<ServiceResult>, MiotError> {
        let devices = self.devices();
        let mut results = Vec::new();
        match call.action {
            ServiceAction::Climate(service) => {
                let targets = devices
                    .iter()
                    .map(|device| &device.climate)
                    .filter(|climate| call.targets(climate.entity_id()));
                for climate in targets {
                    let success = climate.execute(service).await;
                    if success {
                        climate.request_refresh().await;
                    }
                    results.push(ServiceResult {
                        entity_id: climate.entity_id().to_string(),
                        success,
                    });
                }
            }
            ServiceAction::Switch(service) => {
                let targets = devices
                    .iter()
                    .flat_map(|device| device.switches.iter())
                    .filter(|switch| call.targets(switch.entity_id()));
                for switch in targets {
                    let success = switch.execute(service).await;
                    results.push(ServiceResult {
                        entity_id: switch.entity_id().to_string(),
                        success,
                    });
                }
            }
        }
        if results.is_empty()
            && let Some(ids) = &call.entity_ids
        {
            return Err(NotFoundError {
                entity: "Entity",
                id: ids.join(","),
            }
            .into());
        }
        Ok(results)
    }
}
