//! Device-client port: the blocking MIoT client talking to one unit.
//!
//! Every method performs network I/O and blocks the calling thread; callers
//! run them through [`run_blocking`](crate::executor::run_blocking).

use miotac_domain::device::{DeviceInfo, Token};
use miotac_domain::error::DeviceError;
use miotac_domain::status::{CommandReply, FanSpeed, OperationMode, StatusSnapshot};
use miotac_domain::switch::SwitchKind;

/// Handle on one air conditioner.
pub trait MiotDevice: Send + Sync + 'static {
    /// Query model, firmware, hardware and MAC address.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the unit cannot be reached.
    fn info(&self) -> Result<DeviceInfo, DeviceError>;

    /// Fetch a complete status snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the unit cannot be reached.
    fn status(&self) -> Result<StatusSnapshot, DeviceError>;

    /// Power on.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn on(&self) -> Result<CommandReply, DeviceError>;

    /// Power off.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn off(&self) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_target_temperature(&self, temperature: f64) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_mode(&self, mode: OperationMode) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_fan_speed(&self, speed: FanSpeed) -> Result<CommandReply, DeviceError>;

    /// Set the fan speed in percent; `101` selects automatic.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_fan_speed_percent(&self, percent: u8) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_vertical_swing(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// Auxiliary electric heater.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_heater(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// Program a delay timer. `power_on` selects a delay-on timer, otherwise
    /// the unit powers off when it expires. Zero minutes cancels the timer.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_timer(&self, minutes: u16, power_on: bool) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_buzzer(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_clean(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_dryer(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_eco(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_led(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_sleep_mode(&self, on: bool) -> Result<CommandReply, DeviceError>;

    /// Route to the setter backing `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the command could not be delivered.
    fn set_switch(&self, kind: SwitchKind, on: bool) -> Result<CommandReply, DeviceError> {
        match kind {
            SwitchKind::Buzzer => self.set_buzzer(on),
            SwitchKind::Clean => self.set_clean(on),
            SwitchKind::Dryer => self.set_dryer(on),
            SwitchKind::Eco => self.set_eco(on),
            SwitchKind::Led => self.set_led(on),
            SwitchKind::SleepMode => self.set_sleep_mode(on),
        }
    }
}

/// Opens device handles. Connecting is lazy: no I/O happens until the first
/// call on the returned device.
pub trait DeviceConnector: Send + Sync + 'static {
    type Device: MiotDevice;

    fn connect(&self, host: &str, token: &Token) -> Self::Device;
}

impl<T: DeviceConnector> DeviceConnector for std::sync::Arc<T> {
    type Device = T::Device;

    fn connect(&self, host: &str, token: &Token) -> Self::Device {
        (**self).connect(host, token)
    }
}

impl<T: MiotDevice> MiotDevice for std::sync::Arc<T> {
    fn info(&self) -> Result<DeviceInfo, DeviceError> {
        (**self).info()
    }

    fn status(&self) -> Result<StatusSnapshot, DeviceError> {
        (**self).status()
    }

    fn on(&self) -> Result<CommandReply, DeviceError> {
        (**self).on()
    }

    fn off(&self) -> Result<CommandReply, DeviceError> {
        (**self).off()
    }

    fn set_target_temperature(&self, temperature: f64) -> Result<CommandReply, DeviceError> {
        (**self).set_target_temperature(temperature)
    }

    fn set_mode(&self, mode: OperationMode) -> Result<CommandReply, DeviceError> {
        (**self).set_mode(mode)
    }

    fn set_fan_speed(&self, speed: FanSpeed) -> Result<CommandReply, DeviceError> {
        (**self).set_fan_speed(speed)
    }

    fn set_fan_speed_percent(&self, percent: u8) -> Result<CommandReply, DeviceError> {
        (**self).set_fan_speed_percent(percent)
    }

    fn set_vertical_swing(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_vertical_swing(on)
    }

    fn set_heater(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_heater(on)
    }

    fn set_timer(&self, minutes: u16, power_on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_timer(minutes, power_on)
    }

    fn set_buzzer(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_buzzer(on)
    }

    fn set_clean(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_clean(on)
    }

    fn set_dryer(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_dryer(on)
    }

    fn set_eco(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_eco(on)
    }

    fn set_led(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_led(on)
    }

    fn set_sleep_mode(&self, on: bool) -> Result<CommandReply, DeviceError> {
        (**self).set_sleep_mode(on)
    }
}
