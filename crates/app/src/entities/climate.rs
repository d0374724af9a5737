//! Climate entity: HVAC mode, temperatures, fan, swing and aux heat.
//!
//! The climate entity polls on its own and owns its retry tracker, unlike
//! the switches which share an [`UpdateCoordinator`](crate::polling::UpdateCoordinator).

use std::future::Future;
use std::sync::Arc;

use miotac_domain::climate::{
    HvacMode, ICON, MAX_TEMPERATURE, MIN_TEMPERATURE, SUPPORTED_FEATURES, SUPPORTED_HVAC_MODES,
    SUPPORTED_SWING_MODES, SwingMode, TARGET_TEMPERATURE_STEP, TEMPERATURE_UNIT,
    climate_attributes, round_target_temperature,
};
use miotac_domain::device::DeviceDescriptor;
use miotac_domain::entity::{AttributeValue, Entity, EntityState};
use miotac_domain::error::MiotError;
use miotac_domain::service::ClimateService;
use miotac_domain::status::{FanSpeed, StatusSnapshot};

use crate::entities::command::{CommandTarget, try_command};
use crate::entities::object_id;
use crate::polling::{PolledState, Poller, UpdateFailed};
use crate::polling::state::SnapshotReceiver;
use crate::ports::MiotDevice;

pub struct ClimateEntity<D> {
    entity_id: String,
    unique_id: String,
    name: String,
    device: Arc<D>,
    descriptor: DeviceDescriptor,
    state: PolledState,
}

impl<D: MiotDevice> ClimateEntity<D> {
    /// `device_unique_id` is the `<model>-<mac>` id of the unit; `retries` the
    /// number of consecutive failed reads tolerated.
    #[must_use]
    pub fn new(
        name: &str,
        device_unique_id: &str,
        device: Arc<D>,
        descriptor: DeviceDescriptor,
        retries: u32,
    ) -> Self {
        let entity_id = format!("climate.{}", object_id(name, device_unique_id));
        Self {
            state: PolledState::new(entity_id.clone(), retries),
            entity_id,
            unique_id: format!("{device_unique_id}-climate"),
            name: name.to_string(),
            device,
            descriptor,
        }
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

    #[must_use]
    pub fn state(&self) -> &PolledState {
        &self.state
    }

    /// Fetch the device status.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateFailed`] once the consecutive-failure count reaches
    /// the configured maximum; the entity is unavailable from then on.
    pub async fn update(&self) -> Result<(), UpdateFailed> {
        self.state.fetch(&self.device).await
    }

    /// Re-read the device after a command, logging instead of failing.
    pub async fn request_refresh(&self) {
        if let Err(error) = self.update().await {
            tracing::warn!(entity_id = %self.entity_id, error = %error, "refresh after command failed");
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.state.current()
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.snapshot().is_some_and(|s| s.is_on())
    }

    #[must_use]
    pub fn hvac_mode(&self) -> Option<HvacMode> {
        self.snapshot().map(|s| HvacMode::from_snapshot(&s))
    }

    #[must_use]
    pub fn current_temperature(&self) -> Option<f64> {
        self.snapshot().map(|s| s.temperature)
    }

    #[must_use]
    pub fn target_temperature(&self) -> Option<f64> {
        self.snapshot().map(|s| s.target_temperature)
    }

    #[must_use]
    pub fn fan_mode(&self) -> Option<FanSpeed> {
        self.snapshot().map(|s| s.fan_speed)
    }

    #[must_use]
    pub fn swing_mode(&self) -> Option<SwingMode> {
        self.snapshot()
            .map(|s| SwingMode::from_vertical_swing(s.vertical_swing))
    }

    #[must_use]
    pub fn is_aux_heat(&self) -> Option<bool> {
        self.snapshot().map(|s| s.heater)
    }

    /// Round to the half-degree grid and send.
    pub async fn set_temperature(&self, temperature: f64) -> bool {
        let temperature = round_target_temperature(temperature);
        try_command(self, "setting target temperature failed", move |d| {
            d.set_target_temperature(temperature)
        })
        .await
    }

    pub async fn set_fan_mode(&self, speed: FanSpeed) -> bool {
        try_command(self, "setting fan mode failed", move |d| d.set_fan_speed(speed)).await
    }

    /// `Off` powers the unit down; any other mode powers it up first if
    /// needed.
    pub async fn set_hvac_mode(&self, mode: HvacMode) -> bool {
        let Some(operation_mode) = mode.to_operation_mode() else {
            return self.turn_off().await;
        };
        if !self.is_on() {
            self.turn_on().await;
        }
        try_command(self, "setting operation mode failed", move |d| {
            d.set_mode(operation_mode)
        })
        .await
    }

    pub async fn set_swing_mode(&self, mode: SwingMode) -> bool {
        let vertical = mode.is_vertical();
        try_command(self, "setting swing mode failed", move |d| {
            d.set_vertical_swing(vertical)
        })
        .await
    }

    pub async fn turn_aux_heat_on(&self) -> bool {
        try_command(self, "turning on aux heat failed", |d| d.set_heater(true)).await
    }

    pub async fn turn_aux_heat_off(&self) -> bool {
        try_command(self, "turning off aux heat failed", |d| d.set_heater(false)).await
    }

    /// Power on. The cached power state follows immediately on success.
    pub async fn turn_on(&self) -> bool {
        let ok = try_command(self, "turning the device on failed", |d| d.on()).await;
        if ok {
            self.state.amend_snapshot(|s| s.power = true);
        }
        ok
    }

    /// Power off. The cached power state follows immediately on success.
    pub async fn turn_off(&self) -> bool {
        let ok = try_command(self, "turning the device off failed", |d| d.off()).await;
        if ok {
            self.state.amend_snapshot(|s| s.power = false);
        }
        ok
    }

    pub async fn set_fan_speed_percent(&self, percent: u8) -> bool {
        try_command(self, "setting fan speed percent failed", move |d| {
            d.set_fan_speed_percent(percent)
        })
        .await
    }

    pub async fn set_delay_on_timer(&self, minutes: u16) -> bool {
        try_command(self, "setting delay-on timer failed", move |d| {
            d.set_timer(minutes, true)
        })
        .await
    }

    pub async fn set_delay_off_timer(&self, minutes: u16) -> bool {
        try_command(self, "setting delay-off timer failed", move |d| {
            d.set_timer(minutes, false)
        })
        .await
    }

    pub async fn cancel_timer(&self) -> bool {
        try_command(self, "cancelling delay timer failed", |d| d.set_timer(0, false)).await
    }

    /// Run a climate service against this entity.
    pub async fn execute(&self, service: ClimateService) -> bool {
        match service {
            ClimateService::SetTemperature(t) => self.set_temperature(t).await,
            ClimateService::SetHvacMode(mode) => self.set_hvac_mode(mode).await,
            ClimateService::SetFanMode(speed) => self.set_fan_mode(speed).await,
            ClimateService::SetSwingMode(mode) => self.set_swing_mode(mode).await,
            ClimateService::TurnAuxHeatOn => self.turn_aux_heat_on().await,
            ClimateService::TurnAuxHeatOff => self.turn_aux_heat_off().await,
            ClimateService::TurnOn => self.turn_on().await,
            ClimateService::TurnOff => self.turn_off().await,
            ClimateService::SetFanSpeedPercent(p) => self.set_fan_speed_percent(p).await,
            ClimateService::SetDelayOnTimer(m) => self.set_delay_on_timer(m).await,
            ClimateService::SetDelayOffTimer(m) => self.set_delay_off_timer(m).await,
            ClimateService::CancelTimer => self.cancel_timer().await,
        }
    }

    /// Render the entity for the outside world.
    ///
    /// # Errors
    ///
    /// Returns [`MiotError::Validation`] when the entity name is empty.
    pub fn to_entity(&self) -> Result<Entity, MiotError> {
        let mut builder = Entity::builder()
            .entity_id(&self.entity_id)
            .unique_id(&self.unique_id)
            .friendly_name(&self.name)
            .icon(ICON)
            .available(self.is_available())
            .device(self.descriptor.clone())
            .last_updated(self.state.last_updated())
            .attribute(
                "hvac_modes",
                names(SUPPORTED_HVAC_MODES.iter().map(|m| m.as_str())),
            )
            .attribute("fan_modes", names(FanSpeed::ALL.iter().map(|s| s.name())))
            .attribute(
                "swing_modes",
                names(SUPPORTED_SWING_MODES.iter().map(|m| m.as_str())),
            )
            .attribute("min_temp", AttributeValue::Float(MIN_TEMPERATURE))
            .attribute("max_temp", AttributeValue::Float(MAX_TEMPERATURE))
            .attribute(
                "target_temp_step",
                AttributeValue::Float(TARGET_TEMPERATURE_STEP),
            )
            .attribute(
                "supported_features",
                AttributeValue::Int(i64::from(SUPPORTED_FEATURES)),
            )
            .attribute("temperature_unit", AttributeValue::from(TEMPERATURE_UNIT));
        if let Some(snapshot) = self.snapshot() {
            builder = builder
                .state(EntityState::from(HvacMode::from_snapshot(&snapshot)))
                .attributes(climate_attributes(&snapshot))
                .attribute("fan_mode", AttributeValue::from(snapshot.fan_speed.name()))
                .attribute(
                    "swing_mode",
                    AttributeValue::from(
                        SwingMode::from_vertical_swing(snapshot.vertical_swing).as_str(),
                    ),
                );
        }
        builder.build()
    }
}

fn names<'a>(items: impl Iterator<Item = &'a str>) -> AttributeValue {
    AttributeValue::List(items.map(str::to_string).collect())
}

impl<D: MiotDevice> CommandTarget for ClimateEntity<D> {
    type Device = D;

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn device(&self) -> &Arc<D> {
        &self.device
    }

    fn mark_unavailable(&self) {
        self.state.force_unavailable();
    }
}

impl<D: MiotDevice> Poller for ClimateEntity<D> {
    fn name(&self) -> &str {
        &self.entity_id
    }

    fn poll(&self) -> impl Future<Output = Result<(), UpdateFailed>> + Send {
        self.update()
    }

    fn is_available(&self) -> bool {
        ClimateEntity::is_available(self)
    }

    fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.snapshot()
    }

    fn subscribe(&self) -> SnapshotReceiver {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use miotac_domain::error::DeviceError;
    use miotac_domain::status::{CommandReply, OperationMode};

    use super::*;
    use crate::testing::{StubDevice, device_info};

    const UID: &str = "xiaomi.aircondition.mc4-50:EC:50:AA:BB:CC";

    fn climate(device: &Arc<StubDevice>, retries: u32) -> ClimateEntity<StubDevice> {
        let descriptor = DeviceDescriptor::new(UID, &device_info("xiaomi.aircondition.mc4"));
        ClimateEntity::new("Bedroom AC", UID, Arc::clone(device), descriptor, retries)
    }

    #[test]
    fn should_derive_ids_from_name_and_unique_id() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3);
        assert_eq!(entity.entity_id(), "climate.bedroom_ac");
        assert_eq!(entity.unique_id(), format!("{UID}-climate"));
    }

    #[tokio::test]
    async fn should_report_off_when_powered_down() {
        let device = Arc::new(StubDevice::default());
        device.succeed_status(StatusSnapshot {
            power: false,
            mode: OperationMode::Heat,
            ..StatusSnapshot::default()
        });
        let entity = climate(&device, 3);
        entity.update().await.unwrap();
        assert_eq!(entity.hvac_mode(), Some(HvacMode::Off));

        device.succeed_status(StatusSnapshot {
            power: true,
            mode: OperationMode::Heat,
            ..StatusSnapshot::default()
        });
        entity.update().await.unwrap();
        assert_eq!(entity.hvac_mode(), Some(HvacMode::Heat));
    }

    #[tokio::test]
    async fn should_round_target_temperature_before_sending() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3);

        assert!(entity.set_temperature(20.3).await);
        assert!(entity.set_temperature(20.1).await);
        assert!(entity.set_temperature(20.8).await);

        assert_eq!(
            device.commands(),
            vec![
                "set_target_temperature 20.5",
                "set_target_temperature 20",
                "set_target_temperature 21",
            ]
        );
    }

    #[tokio::test]
    async fn should_power_on_before_setting_mode() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3);
        entity.update().await.unwrap();

        assert!(entity.set_hvac_mode(HvacMode::FanOnly).await);

        assert_eq!(device.commands(), vec!["on", "set_mode 4"]);
        assert!(entity.is_on());
    }

    #[tokio::test]
    async fn should_power_off_for_off_mode() {
        let device = Arc::new(StubDevice::default());
        device.succeed_status(StatusSnapshot {
            power: true,
            ..StatusSnapshot::default()
        });
        let entity = climate(&device, 3);
        entity.update().await.unwrap();

        assert!(entity.set_hvac_mode(HvacMode::Off).await);

        assert_eq!(device.commands(), vec!["off"]);
        assert_eq!(entity.hvac_mode(), Some(HvacMode::Off));
    }

    #[tokio::test]
    async fn should_degrade_on_refused_write_and_recover_on_read() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3);
        entity.update().await.unwrap();
        device.reply_with(Ok(CommandReply::new(serde_json::json!(["error"]))));

        assert!(!entity.turn_on().await);

        assert!(!entity.is_available());
        assert!(!entity.is_on());
        assert!(!device.snapshot().power);

        entity.update().await.unwrap();
        assert!(entity.is_available());
    }

    #[tokio::test]
    async fn should_degrade_on_write_error() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3);
        entity.update().await.unwrap();
        device.reply_with(Err(DeviceError::Timeout));

        assert!(!entity.set_fan_mode(FanSpeed::Level2).await);
        assert!(!entity.is_available());
        assert_eq!(entity.fan_mode(), Some(FanSpeed::Auto));
    }

    #[tokio::test]
    async fn should_become_unavailable_after_retries_failed_reads() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3);
        entity.update().await.unwrap();
        device.fail_status(DeviceError::Timeout);

        assert!(entity.update().await.is_ok());
        assert!(entity.update().await.is_ok());
        assert!(entity.is_available());
        assert!(entity.update().await.is_err());
        assert!(!entity.is_available());
        assert_eq!(entity.target_temperature(), Some(26.0));
    }

    #[tokio::test]
    async fn should_map_services_to_device_commands() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3);

        entity.execute(ClimateService::SetSwingMode(SwingMode::Vertical)).await;
        entity.execute(ClimateService::TurnAuxHeatOn).await;
        entity.execute(ClimateService::SetFanSpeedPercent(101)).await;
        entity.execute(ClimateService::SetDelayOnTimer(30)).await;
        entity.execute(ClimateService::SetDelayOffTimer(45)).await;
        entity.execute(ClimateService::CancelTimer).await;

        assert_eq!(
            device.commands(),
            vec![
                "set_vertical_swing true",
                "set_heater true",
                "set_fan_speed_percent 101",
                "set_timer 30 true",
                "set_timer 45 false",
                "set_timer 0 false",
            ]
        );
    }

    #[tokio::test]
    async fn should_render_unknown_entity_before_first_read() {
        let device = Arc::new(StubDevice::default());
        let entity = climate(&device, 3).to_entity().unwrap();
        assert_eq!(entity.state, EntityState::Unavailable);
        assert!(!entity.available);
        assert!(entity.get_attribute("target_temperature").is_none());
        assert_eq!(
            entity.get_attribute("min_temp"),
            Some(&AttributeValue::Float(16.0))
        );
    }

    #[tokio::test]
    async fn should_render_mode_and_attributes_after_read() {
        let device = Arc::new(StubDevice::default());
        device.succeed_status(StatusSnapshot {
            power: true,
            mode: OperationMode::Cool,
            fan_speed: FanSpeed::Level5,
            vertical_swing: true,
            target_temperature: 22.5,
            ..StatusSnapshot::default()
        });
        let climate = climate(&device, 3);
        climate.update().await.unwrap();

        let entity = climate.to_entity().unwrap();

        assert_eq!(entity.state, EntityState::Cool);
        assert_eq!(entity.icon.as_deref(), Some("mdi:air-conditioner"));
        assert_eq!(
            entity.get_attribute("fan_mode"),
            Some(&AttributeValue::String("Level5".to_string()))
        );
        assert_eq!(
            entity.get_attribute("swing_mode"),
            Some(&AttributeValue::String("vertical".to_string()))
        );
        assert_eq!(
            entity.get_attribute("temperature"),
            Some(&AttributeValue::Float(22.5))
        );
        assert_eq!(entity.get_attribute("mode"), Some(&AttributeValue::Int(2)));
        assert_eq!(
            entity.device.as_ref().map(|d| d.manufacturer.as_str()),
            Some("Xiaomi")
        );
    }
}
