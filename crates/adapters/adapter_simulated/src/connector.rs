use std::collections::HashMap;
use std::sync::Arc;

use miotac_app::ports::{DeviceConnector, MiotDevice};
use miotac_domain::device::{DeviceInfo, Token};
use miotac_domain::error::DeviceError;
use miotac_domain::status::{CommandReply, FanSpeed, OperationMode, StatusSnapshot};
use miotac_domain::switch::SwitchKind;

use crate::device::SimulatedAirConditioner;

struct Registered {
    token: Token,
    unit: Arc<SimulatedAirConditioner>,
}

/// Resolves `(host, token)` pairs to simulated units.
#[derive(Default)]
pub struct SimulatedConnector {
    units: HashMap<String, Registered>,
}

impl SimulatedConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `unit` at `host`, reachable with `token` only.
    #[must_use]
    pub fn with_unit(
        mut self,
        host: impl Into<String>,
        token: Token,
        unit: SimulatedAirConditioner,
    ) -> Self {
        self.add(host, token, unit);
        self
    }

    /// Serve `unit` at `host` and return a handle for fault injection.
    pub fn add(
        &mut self,
        host: impl Into<String>,
        token: Token,
        unit: SimulatedAirConditioner,
    ) -> Arc<SimulatedAirConditioner> {
        let unit = Arc::new(unit);
        self.units.insert(
            host.into(),
            Registered {
                token,
                unit: Arc::clone(&unit),
            },
        );
        unit
    }

    #[must_use]
    pub fn unit(&self, host: &str) -> Option<&Arc<SimulatedAirConditioner>> {
        self.units.get(host).map(|registered| &registered.unit)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl DeviceConnector for SimulatedConnector {
    type Device = SimulatedLink;

    fn connect(&self, host: &str, token: &Token) -> SimulatedLink {
        let target = match self.units.get(host) {
            None => Target::Unreachable,
            Some(registered) if registered.token != *token => Target::WrongToken,
            Some(registered) => Target::Unit(Arc::clone(&registered.unit)),
        };
        tracing::debug!(host, token = %token, "opened simulated link");
        SimulatedLink {
            host: host.to_string(),
            target,
        }
    }
}

enum Target {
    Unit(Arc<SimulatedAirConditioner>),
    WrongToken,
    Unreachable,
}

/// One connection to a simulated unit.
pub struct SimulatedLink {
    host: String,
    target: Target,
}

impl SimulatedLink {
    fn unit(&self) -> Result<&SimulatedAirConditioner, DeviceError> {
        match &self.target {
            Target::Unit(unit) => Ok(unit),
            Target::WrongToken => Err(DeviceError::Timeout),
            Target::Unreachable => Err(DeviceError::Unreachable {
                host: self.host.clone(),
            }),
        }
    }
}

impl MiotDevice for SimulatedLink {
    fn info(&self) -> Result<DeviceInfo, DeviceError> {
        let unit = self.unit()?;
        unit.ping().map(|()| unit.info())
    }

    fn status(&self) -> Result<StatusSnapshot, DeviceError> {
        self.unit()?.read_status()
    }

    fn on(&self) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_power(true)
    }

    fn off(&self) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_power(false)
    }

    fn set_target_temperature(&self, temperature: f64) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_target_temperature(temperature)
    }

    fn set_mode(&self, mode: OperationMode) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_mode(mode)
    }

    fn set_fan_speed(&self, speed: FanSpeed) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_fan_speed(speed)
    }

    fn set_fan_speed_percent(&self, percent: u8) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_fan_speed_percent(percent)
    }

    fn set_vertical_swing(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_vertical_swing(on)
    }

    fn set_heater(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_heater(on)
    }

    fn set_timer(&self, minutes: u16, power_on: bool) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_timer(minutes, power_on)
    }

    fn set_buzzer(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.set_switch(SwitchKind::Buzzer, on)
    }

    fn set_clean(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.set_switch(SwitchKind::Clean, on)
    }

    fn set_dryer(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.set_switch(SwitchKind::Dryer, on)
    }

    fn set_eco(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.set_switch(SwitchKind::Eco, on)
    }

    fn set_led(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.set_switch(SwitchKind::Led, on)
    }

    fn set_sleep_mode(&self, on: bool) -> Result<CommandReply, DeviceError> {
        self.set_switch(SwitchKind::SleepMode, on)
    }

    fn set_switch(&self, kind: SwitchKind, on: bool) -> Result<CommandReply, DeviceError> {
        self.unit()?.set_switch(kind, on)
    }
}
