//! Scriptable in-memory device used by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use miotac_domain::config_entry::ConfigEntry;
use miotac_domain::device::{DeviceInfo, Token};
use miotac_domain::error::{DeviceError, MiotError, NotFoundError};
use miotac_domain::id::EntryId;
use miotac_domain::model::MODEL_AIRCONDITION_MC4;
use miotac_domain::status::{CommandReply, FanSpeed, OperationMode, StatusSnapshot};

use crate::ports::{ConfigEntryRepository, DeviceConnector, MiotDevice};

pub(crate) const TOKEN: &str = "0123456789abcdef0123456789abcdef";
pub(crate) const MAC: &str = "50:EC:50:AA:BB:CC";

pub(crate) fn device_info(model: &str) -> DeviceInfo {
    DeviceInfo {
        model: model.to_string(),
        firmware_version: "2.1.3".to_string(),
        hardware_version: "esp32".to_string(),
        mac_address: MAC.to_string(),
    }
}

/// Applies accepted commands to its own status, so a refresh after a
/// command observes it.
pub(crate) struct StubDevice {
    info: Mutex<Result<DeviceInfo, DeviceError>>,
    status: Mutex<StatusSnapshot>,
    status_error: Mutex<Option<DeviceError>>,
    reply: Mutex<Result<CommandReply, DeviceError>>,
    status_calls: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

impl Default for StubDevice {
    fn default() -> Self {
        Self {
            info: Mutex::new(Ok(device_info(MODEL_AIRCONDITION_MC4))),
            status: Mutex::new(StatusSnapshot::default()),
            status_error: Mutex::new(None),
            reply: Mutex::new(Ok(CommandReply::ok())),
            status_calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        }
    }
}

impl StubDevice {
    pub(crate) fn with_model(model: &str) -> Self {
        let stub = Self::default();
        *stub.info.lock().unwrap() = Ok(device_info(model));
        stub
    }

    pub(crate) fn offline() -> Self {
        let stub = Self::default();
        *stub.info.lock().unwrap() = Err(DeviceError::Timeout);
        *stub.status_error.lock().unwrap() = Some(DeviceError::Timeout);
        stub
    }

    pub(crate) fn fail_status(&self, error: DeviceError) {
        *self.status_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn succeed_status(&self, snapshot: StatusSnapshot) {
        *self.status_error.lock().unwrap() = None;
        *self.status.lock().unwrap() = snapshot;
    }

    pub(crate) fn go_online(&self) {
        *self.info.lock().unwrap() = Ok(device_info(MODEL_AIRCONDITION_MC4));
        *self.status_error.lock().unwrap() = None;
    }

    pub(crate) fn reply_with(&self, reply: Result<CommandReply, DeviceError>) {
        *self.reply.lock().unwrap() = reply;
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn snapshot(&self) -> StatusSnapshot {
        self.status.lock().unwrap().clone()
    }

    fn command(
        &self,
        name: String,
        apply: impl FnOnce(&mut StatusSnapshot),
    ) -> Result<CommandReply, DeviceError> {
        self.commands.lock().unwrap().push(name);
        let reply = self.reply.lock().unwrap().clone();
        if reply.as_ref().is_ok_and(CommandReply::is_success) {
            apply(&mut *self.status.lock().unwrap());
        }
        reply
    }
}

impl MiotDevice for StubDevice {
    fn info(&self) -> Result<DeviceInfo, DeviceError> {
        self.info.lock().unwrap().clone()
    }

    fn status(&self) -> Result<StatusSnapshot, DeviceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.status_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.snapshot())
    }

    fn on(&self) -> Result<CommandReply, DeviceError> {
        self.command("on".to_string(), |s| s.power = true)
    }

    fn off(&self) -> Result<CommandReply, DeviceError> {
        self.command("off".to_string(), |s| s.power = false)
    }

    fn set_target_temperature(&self, temperature: f64) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_target_temperature {temperature}"), |s| {
            s.target_temperature = temperature;
        })
    }

    fn set_mode(&self, mode: OperationMode) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_mode {}", mode.value()), |s| s.mode = mode)
    }

    fn set_fan_speed(&self, speed: FanSpeed) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_fan_speed {speed}"), |s| s.fan_speed = speed)
    }

    fn set_fan_speed_percent(&self, percent: u8) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_fan_speed_percent {percent}"), |s| {
            s.fan_speed_percent = percent;
        })
    }

    fn set_vertical_swing(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_vertical_swing {on}"), |s| s.vertical_swing = on)
    }

    fn set_heater(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_heater {on}"), |s| s.heater = on)
    }

    fn set_timer(&self, minutes: u16, power_on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_timer {minutes} {power_on}"), |s| {
            s.timer.enabled = minutes > 0;
            s.timer.minutes = minutes;
            s.timer.power_on = power_on;
        })
    }

    fn set_buzzer(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_buzzer {on}"), |s| s.buzzer = on)
    }

    fn set_clean(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_clean {on}"), |s| s.clean.cleaning = on)
    }

    fn set_dryer(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_dryer {on}"), |s| s.dryer = on)
    }

    fn set_eco(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_eco {on}"), |s| s.eco = on)
    }

    fn set_led(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_led {on}"), |s| s.led = on)
    }

    fn set_sleep_mode(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(format!("set_sleep_mode {on}"), |s| s.sleep_mode = on)
    }
}

/// Hands out pre-registered stubs by host; unknown hosts get an offline stub.
#[derive(Default)]
pub(crate) struct StubConnector {
    devices: Mutex<HashMap<String, Arc<StubDevice>>>,
}

impl StubConnector {
    pub(crate) fn add(&self, host: &str, device: StubDevice) -> Arc<StubDevice> {
        let device = Arc::new(device);
        self.devices
            .lock()
            .unwrap()
            .insert(host.to_string(), Arc::clone(&device));
        device
    }
}

impl DeviceConnector for StubConnector {
    type Device = Arc<StubDevice>;

    fn connect(&self, host: &str, _token: &Token) -> Self::Device {
        Arc::clone(
            self.devices
                .lock()
                .unwrap()
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(StubDevice::offline())),
        )
    }
}

/// Config entries kept in a vector.
#[derive(Default)]
pub(crate) struct MemoryRepo {
    entries: Mutex<Vec<ConfigEntry>>,
}

impl ConfigEntryRepository for MemoryRepo {
    async fn create(&self, entry: ConfigEntry) -> Result<ConfigEntry, MiotError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn get_by_id(&self, id: EntryId) -> Result<Option<ConfigEntry>, MiotError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.entry_id == id)
            .cloned())
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<ConfigEntry>, MiotError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.unique_id == unique_id)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<ConfigEntry>, MiotError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn delete(&self, id: EntryId) -> Result<(), MiotError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.entry_id != id);
        if entries.len() == before {
            return Err(NotFoundError {
                entity: "ConfigEntry",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
