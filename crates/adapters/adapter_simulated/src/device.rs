use std::sync::{Mutex, MutexGuard, PoisonError};

use miotac_domain::climate::{MAX_TEMPERATURE, MIN_TEMPERATURE};
use miotac_domain::device::DeviceInfo;
use miotac_domain::error::DeviceError;
use miotac_domain::service::{FAN_SPEED_PERCENT_MAX, FAN_SPEED_PERCENT_MIN, TIMER_MINUTES_MAX};
use miotac_domain::status::{CommandReply, FanSpeed, OperationMode, StatusSnapshot};
use miotac_domain::switch::SwitchKind;

/// Room temperature change per status read while the compressor runs.
const DRIFT_STEP: f64 = 0.5;

/// Error code of the unit for a property value it does not accept.
const INVALID_VALUE_CODE: i64 = -4005;

#[derive(Debug)]
struct State {
    status: StatusSnapshot,
    offline: bool,
    failing_reads: u32,
    refusing: bool,
}

/// One simulated unit.
///
/// Faults can be injected at runtime: going offline, failing a number of
/// reads, or refusing commands with a non-`["ok"]` reply.
#[derive(Debug)]
pub struct SimulatedAirConditioner {
    info: DeviceInfo,
    state: Mutex<State>,
}

impl SimulatedAirConditioner {
    #[must_use]
    pub fn new(model: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self::with_status(model, mac_address, StatusSnapshot::default())
    }

    #[must_use]
    pub fn with_status(
        model: impl Into<String>,
        mac_address: impl Into<String>,
        status: StatusSnapshot,
    ) -> Self {
        Self {
            info: DeviceInfo {
                model: model.into(),
                firmware_version: "2.1.3".to_string(),
                hardware_version: "esp32".to_string(),
                mac_address: mac_address.into(),
            },
            state: Mutex::new(State {
                status,
                offline: false,
                failing_reads: 0,
                refusing: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    /// Current status without drifting the room temperature.
    #[must_use]
    pub fn peek(&self) -> StatusSnapshot {
        self.lock().status.clone()
    }

    /// Stop (or resume) answering anything.
    pub fn set_offline(&self, offline: bool) {
        tracing::info!(model = %self.info.model, offline, "simulated unit connectivity changed");
        self.lock().offline = offline;
    }

    /// Make the next `count` status reads time out.
    pub fn fail_next_reads(&self, count: u32) {
        self.lock().failing_reads = count;
    }

    /// Answer every command with an error reply instead of `["ok"]`.
    pub fn refuse_commands(&self, refusing: bool) {
        self.lock().refusing = refusing;
    }

    /// Answer a ping.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Timeout`] while offline.
    pub fn ping(&self) -> Result<(), DeviceError> {
        if self.lock().offline {
            return Err(DeviceError::Timeout);
        }
        Ok(())
    }

    /// Read the status. The room temperature moves one step towards the
    /// target while the unit is cooling or heating.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Timeout`] while offline or while injected read
    /// failures remain.
    pub fn read_status(&self) -> Result<StatusSnapshot, DeviceError> {
        let mut state = self.lock();
        if state.offline {
            return Err(DeviceError::Timeout);
        }
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(DeviceError::Timeout);
        }
        drift(&mut state.status);
        Ok(state.status.clone())
    }

    /// Apply a command.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Timeout`] while offline.
    pub(crate) fn command(
        &self,
        apply: impl FnOnce(&mut StatusSnapshot) -> Result<(), DeviceError>,
    ) -> Result<CommandReply, DeviceError> {
        let mut state = self.lock();
        if state.offline {
            return Err(DeviceError::Timeout);
        }
        if state.refusing {
            return Ok(CommandReply::new(serde_json::json!(["error"])));
        }
        apply(&mut state.status)?;
        Ok(CommandReply::ok())
    }

    pub(crate) fn set_power(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            s.power = on;
            Ok(())
        })
    }

    pub(crate) fn set_target_temperature(&self, value: f64) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&value) {
                return Err(invalid_value("target temperature"));
            }
            s.target_temperature = value;
            Ok(())
        })
    }

    pub(crate) fn set_mode(&self, mode: OperationMode) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            s.mode = mode;
            Ok(())
        })
    }

    pub(crate) fn set_fan_speed(&self, speed: FanSpeed) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            s.fan_speed = speed;
            Ok(())
        })
    }

    pub(crate) fn set_fan_speed_percent(&self, percent: u8) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            if !(FAN_SPEED_PERCENT_MIN..=FAN_SPEED_PERCENT_MAX).contains(&percent) {
                return Err(invalid_value("fan speed percent"));
            }
            s.fan_speed_percent = percent;
            Ok(())
        })
    }

    pub(crate) fn set_vertical_swing(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            s.vertical_swing = on;
            Ok(())
        })
    }

    pub(crate) fn set_heater(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            s.heater = on;
            Ok(())
        })
    }

    pub(crate) fn set_timer(&self, minutes: u16, power_on: bool) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            if minutes > TIMER_MINUTES_MAX {
                return Err(invalid_value("timer minutes"));
            }
            s.timer.enabled = minutes > 0;
            s.timer.minutes = minutes;
            s.timer.power_on = power_on;
            Ok(())
        })
    }

    pub(crate) fn set_switch(&self, kind: SwitchKind, on: bool) -> Result<CommandReply, DeviceError> {
        self.command(|s| {
            match kind {
                SwitchKind::Buzzer => s.buzzer = on,
                SwitchKind::Clean => {
                    s.clean.cleaning = on;
                    s.clean.progress = 0;
                }
                SwitchKind::Dryer => s.dryer = on,
                SwitchKind::Eco => s.eco = on,
                SwitchKind::Led => s.led = on,
                SwitchKind::SleepMode => s.sleep_mode = on,
            }
            Ok(())
        })
    }
}

fn invalid_value(property: &str) -> DeviceError {
    DeviceError::Remote {
        code: INVALID_VALUE_CODE,
        message: format!("invalid {property}"),
    }
}

fn drift(status: &mut StatusSnapshot) {
    if !status.power {
        return;
    }
    let gap = status.target_temperature - status.temperature;
    let towards_target = match status.mode {
        OperationMode::Cool => gap < 0.0,
        OperationMode::Heat => gap > 0.0,
        OperationMode::Dry | OperationMode::Fan => false,
    };
    if towards_target {
        let step = gap.abs().min(DRIFT_STEP);
        status.temperature += step.copysign(gap);
    }
    if status.clean.cleaning {
        status.clean.progress = status.clean.progress.saturating_add(25).min(100);
        if status.clean.progress == 100 {
            status.clean.cleaning = false;
        }
    }
    status.total_running_duration = status.total_running_duration.saturating_add(1);
}
