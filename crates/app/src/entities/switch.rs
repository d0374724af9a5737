//! On/off switches driven by a shared coordinator.

use std::sync::{Arc, Mutex, PoisonError};

use miotac_domain::device::DeviceDescriptor;
use miotac_domain::entity::{Entity, EntityState};
use miotac_domain::error::MiotError;
use miotac_domain::service::SwitchService;
use miotac_domain::switch::SwitchKind;

use crate::entities::command::{CommandTarget, try_command};
use crate::entities::object_id;
use crate::polling::UpdateCoordinator;
use crate::ports::MiotDevice;

/// One boolean feature of the unit.
///
/// Switches never fetch on their own: they read the snapshot of the
/// coordinator they share with their siblings. A failed command degrades
/// only the switch that sent it, until the coordinator's next successful
/// fetch.
pub struct SwitchEntity<D> {
    kind: SwitchKind,
    entity_id: String,
    unique_id: String,
    name: String,
    coordinator: Arc<UpdateCoordinator<D>>,
    descriptor: DeviceDescriptor,
    /// Coordinator success count at the time of the last failed command.
    degraded_at: Mutex<Option<u64>>,
}

impl<D: MiotDevice> SwitchEntity<D> {
    #[must_use]
    pub fn new(
        kind: SwitchKind,
        name: &str,
        device_unique_id: &str,
        coordinator: Arc<UpdateCoordinator<D>>,
        descriptor: DeviceDescriptor,
    ) -> Self {
        Self {
            kind,
            entity_id: format!(
                "switch.{}_{}",
                object_id(name, device_unique_id),
                kind.key()
            ),
            unique_id: format!("{device_unique_id}-{}", kind.key()),
            name: format!("{name} {}", kind.name_suffix()),
            coordinator,
            descriptor,
            degraded_at: Mutex::new(None),
        }
    }

    /// One switch per [`SwitchKind`], all on the same coordinator.
    #[must_use]
    pub fn all(
        name: &str,
        device_unique_id: &str,
        coordinator: &Arc<UpdateCoordinator<D>>,
        descriptor: &DeviceDescriptor,
    ) -> Vec<Self> {
        SwitchKind::ALL
            .into_iter()
            .map(|kind| {
                Self::new(
                    kind,
                    name,
                    device_unique_id,
                    Arc::clone(coordinator),
                    descriptor.clone(),
                )
            })
            .collect()
    }

    #[must_use]
    pub fn kind(&self) -> SwitchKind {
        self.kind
    }

    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` until the coordinator has fetched once.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.coordinator
            .current_snapshot()
            .map(|snapshot| self.kind.is_on(&snapshot))
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        let degraded_at = *self
            .degraded_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.coordinator.is_available()
            && degraded_at.is_none_or(|generation| self.coordinator.successes() > generation)
    }

    pub async fn turn_on(&self) -> bool {
        self.set(true).await
    }

    pub async fn turn_off(&self) -> bool {
        self.set(false).await
    }

    /// Flip the switch based on the last known state.
    pub async fn toggle(&self) -> bool {
        let on = self.is_on().unwrap_or(false);
        self.set(!on).await
    }

    pub async fn execute(&self, service: SwitchService) -> bool {
        match service {
            SwitchService::TurnOn => self.turn_on().await,
            SwitchService::TurnOff => self.turn_off().await,
            SwitchService::Toggle => self.toggle().await,
        }
    }

    async fn set(&self, on: bool) -> bool {
        let kind = self.kind;
        let description = format!(
            "turning {} {} failed",
            kind.name_suffix(),
            if on { "on" } else { "off" }
        );
        let ok = try_command(self, &description, move |d| d.set_switch(kind, on)).await;
        if ok {
            self.coordinator.request_refresh().await;
        }
        ok
    }

    /// Render the entity for the outside world.
    ///
    /// # Errors
    ///
    /// Returns [`MiotError::Validation`] when the entity name is empty.
    pub fn to_entity(&self) -> Result<Entity, MiotError> {
        let state = self
            .is_on()
            .map_or(EntityState::Unknown, EntityState::from_bool);
        Entity::builder()
            .entity_id(&self.entity_id)
            .unique_id(&self.unique_id)
            .friendly_name(&self.name)
            .icon(self.kind.icon())
            .state(state)
            .available(self.is_available())
            .device(self.descriptor.clone())
            .last_updated(self.coordinator.state().last_updated())
            .build()
    }
}

impl<D: MiotDevice> CommandTarget for SwitchEntity<D> {
    type Device = D;

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn device(&self) -> &Arc<D> {
        self.coordinator.device()
    }

    fn mark_unavailable(&self) {
        let generation = self.coordinator.successes();
        *self
            .degraded_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(generation);
        tracing::warn!(entity_id = %self.entity_id, "marked unavailable after a failed command");
        self.coordinator.state().notify();
    }
}

#[cfg(test)]
mod tests {
    use miotac_domain::error::DeviceError;
    use miotac_domain::status::{CommandReply, StatusSnapshot};

    use super::*;
    use crate::testing::{StubDevice, device_info};

    const UID: &str = "xiaomi.aircondition.mc4-50:EC:50:AA:BB:CC";

    fn switches(device: &Arc<StubDevice>) -> (Arc<UpdateCoordinator<StubDevice>>, Vec<SwitchEntity<StubDevice>>) {
        let coordinator = Arc::new(UpdateCoordinator::new("Bedroom AC", Arc::clone(device), 3));
        let descriptor = DeviceDescriptor::new(UID, &device_info("xiaomi.aircondition.mc4"));
        let switches = SwitchEntity::all("Bedroom AC", UID, &coordinator, &descriptor);
        (coordinator, switches)
    }

    fn find(switches: &[SwitchEntity<StubDevice>], kind: SwitchKind) -> &SwitchEntity<StubDevice> {
        switches.iter().find(|s| s.kind() == kind).unwrap()
    }

    #[test]
    fn should_name_switches_after_device() {
        let device = Arc::new(StubDevice::default());
        let (_, switches) = switches(&device);
        let led = find(&switches, SwitchKind::Led);
        assert_eq!(led.entity_id(), "switch.bedroom_ac_led");
        assert_eq!(led.unique_id(), format!("{UID}-led"));
        assert_eq!(led.name(), "Bedroom AC LED enabled");
        assert_eq!(switches.len(), 6);
    }

    #[tokio::test]
    async fn should_share_one_fetch_between_all_switches() {
        let device = Arc::new(StubDevice::default());
        device.succeed_status(StatusSnapshot {
            eco: true,
            led: false,
            ..StatusSnapshot::default()
        });
        let (coordinator, switches) = switches(&device);
        assert!(switches.iter().all(|s| s.is_on().is_none()));

        coordinator.refresh().await.unwrap();

        assert_eq!(device.status_calls(), 1);
        assert_eq!(find(&switches, SwitchKind::Eco).is_on(), Some(true));
        assert_eq!(find(&switches, SwitchKind::Led).is_on(), Some(false));
        assert!(switches.iter().all(SwitchEntity::is_available));
    }

    #[tokio::test]
    async fn should_send_command_then_refresh() {
        let device = Arc::new(StubDevice::default());
        let (coordinator, switches) = switches(&device);
        coordinator.refresh().await.unwrap();

        assert!(find(&switches, SwitchKind::SleepMode).turn_on().await);

        assert_eq!(device.commands(), vec!["set_sleep_mode true"]);
        assert_eq!(device.status_calls(), 2);
        assert_eq!(find(&switches, SwitchKind::SleepMode).is_on(), Some(true));
    }

    #[tokio::test]
    async fn should_toggle_from_last_known_state() {
        let device = Arc::new(StubDevice::default());
        let (coordinator, switches) = switches(&device);
        coordinator.refresh().await.unwrap();
        let buzzer = find(&switches, SwitchKind::Buzzer);
        assert_eq!(buzzer.is_on(), Some(true));

        assert!(buzzer.execute(SwitchService::Toggle).await);

        assert_eq!(device.commands(), vec!["set_buzzer false"]);
        assert_eq!(buzzer.is_on(), Some(false));
    }

    #[tokio::test]
    async fn should_degrade_only_failing_switch_until_next_fetch() {
        let device = Arc::new(StubDevice::default());
        let (coordinator, switches) = switches(&device);
        coordinator.refresh().await.unwrap();
        device.reply_with(Ok(CommandReply::new(serde_json::json!(["error"]))));
        device.fail_status(DeviceError::Timeout);

        let eco = find(&switches, SwitchKind::Eco);
        assert!(!eco.turn_on().await);

        assert!(!eco.is_available());
        assert!(find(&switches, SwitchKind::Dryer).is_available());
        assert_eq!(eco.to_entity().unwrap().state, EntityState::Unavailable);

        device.succeed_status(StatusSnapshot::default());
        coordinator.refresh().await.unwrap();
        assert!(eco.is_available());
    }

    #[tokio::test]
    async fn should_stay_degraded_when_refused_unit_is_still_readable() {
        let device = Arc::new(StubDevice::default());
        let (coordinator, switches) = switches(&device);
        coordinator.refresh().await.unwrap();
        device.reply_with(Ok(CommandReply::new(serde_json::json!(["error"]))));

        let eco = find(&switches, SwitchKind::Eco);
        assert!(!eco.turn_on().await);

        assert_eq!(device.status_calls(), 1);
        assert!(!eco.is_available());
        coordinator.refresh().await.unwrap();
        assert!(eco.is_available());
    }

    #[tokio::test]
    async fn should_follow_coordinator_unavailability() {
        let device = Arc::new(StubDevice::default());
        let (coordinator, switches) = switches(&device);
        coordinator.refresh().await.unwrap();
        device.fail_status(DeviceError::Timeout);

        let _ = coordinator.refresh().await;
        let _ = coordinator.refresh().await;
        assert!(switches.iter().all(SwitchEntity::is_available));
        assert!(coordinator.refresh().await.is_err());
        assert!(!switches.iter().any(SwitchEntity::is_available));
    }

    #[tokio::test]
    async fn should_render_icon_and_state() {
        let device = Arc::new(StubDevice::default());
        let (coordinator, switches) = switches(&device);
        coordinator.refresh().await.unwrap();

        let entity = find(&switches, SwitchKind::Led).to_entity().unwrap();

        assert_eq!(entity.state, EntityState::On);
        assert_eq!(entity.icon.as_deref(), Some("mdi:lightbulb"));
        assert!(entity.available);
        assert_eq!(entity.friendly_name, "Bedroom AC LED enabled");
    }
}
