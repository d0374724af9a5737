//! Device-side status model: what one status fetch returns.
//!
//! A [`StatusSnapshot`] is immutable: pollers replace it wholesale on each
//! successful fetch and share it behind an `Arc`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Operation mode as encoded by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OperationMode {
    Cool = 2,
    Dry = 3,
    Fan = 4,
    Heat = 5,
}

impl OperationMode {
    /// Raw protocol value.
    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OperationMode {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Cool),
            3 => Ok(Self::Dry),
            4 => Ok(Self::Fan),
            5 => Ok(Self::Heat),
            other => Err(ValidationError::UnknownOperationMode(other)),
        }
    }
}

impl From<OperationMode> for u8 {
    fn from(mode: OperationMode) -> Self {
        mode.value()
    }
}

/// Fan speed as encoded by the unit. The host uses the variant names
/// (`"Auto"`, `"Level1"` …) as fan-mode names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FanSpeed {
    Auto = 0,
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
    Level4 = 4,
    Level5 = 5,
    Level6 = 6,
    Level7 = 7,
}

impl FanSpeed {
    /// Every speed in protocol order.
    pub const ALL: [Self; 8] = [
        Self::Auto,
        Self::Level1,
        Self::Level2,
        Self::Level3,
        Self::Level4,
        Self::Level5,
        Self::Level6,
        Self::Level7,
    ];

    /// Raw protocol value.
    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Fan-mode name shown to the host.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Level1 => "Level1",
            Self::Level2 => "Level2",
            Self::Level3 => "Level3",
            Self::Level4 => "Level4",
            Self::Level5 => "Level5",
            Self::Level6 => "Level6",
            Self::Level7 => "Level7",
        }
    }

    /// Look a speed up by its raw protocol value.
    #[must_use]
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|speed| speed.value() == value)
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FanSpeed {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|speed| speed.name() == s)
            .ok_or_else(|| ValidationError::UnknownFanSpeed(s.to_string()))
    }
}

impl TryFrom<String> for FanSpeed {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FanSpeed> for String {
    fn from(speed: FanSpeed) -> Self {
        speed.name().to_string()
    }
}

/// Self-cleaning progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleanStatus {
    pub cleaning: bool,
    /// Completion percentage (0–100).
    pub progress: u8,
}

/// Delay timer programmed on the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerStatus {
    pub enabled: bool,
    pub minutes: u16,
    /// `true` for a delay-on timer, `false` for a delay-off timer.
    pub power_on: bool,
}

/// One complete status reading of the unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub power: bool,
    pub mode: OperationMode,
    pub target_temperature: f64,
    /// Measured room temperature.
    pub temperature: f64,
    pub fan_speed: FanSpeed,
    /// Fan speed in percent; `101` means automatic.
    pub fan_speed_percent: u8,
    pub vertical_swing: bool,
    pub heater: bool,
    pub buzzer: bool,
    pub eco: bool,
    pub dryer: bool,
    pub led: bool,
    pub sleep_mode: bool,
    pub clean: CleanStatus,
    pub timer: TimerStatus,
    /// Total running time in minutes.
    pub total_running_duration: u32,
}

impl StatusSnapshot {
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.power
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            power: false,
            mode: OperationMode::Cool,
            target_temperature: 26.0,
            temperature: 26.0,
            fan_speed: FanSpeed::Auto,
            fan_speed_percent: 101,
            vertical_swing: false,
            heater: false,
            buzzer: true,
            eco: false,
            dryer: false,
            led: true,
            sleep_mode: false,
            clean: CleanStatus::default(),
            timer: TimerStatus::default(),
            total_running_duration: 0,
        }
    }
}

/// Raw reply of the unit to a command.
///
/// The unit acknowledges a command with the JSON array `["ok"]`; anything
/// else is a refusal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandReply(serde_json::Value);

impl CommandReply {
    /// The acknowledgement sentinel.
    #[must_use]
    pub fn ok() -> Self {
        Self(serde_json::json!(["ok"]))
    }

    /// Wrap an arbitrary reply value.
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Whether the reply is the acknowledgement sentinel.
    #[must_use]
    pub fn is_success(&self) -> bool {
        *self == Self::ok()
    }
}

impl fmt::Display for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_operation_mode_values() {
        assert_eq!(OperationMode::try_from(2), Ok(OperationMode::Cool));
        assert_eq!(OperationMode::try_from(5), Ok(OperationMode::Heat));
        assert_eq!(OperationMode::Fan.value(), 4);
        assert_eq!(
            OperationMode::try_from(9),
            Err(ValidationError::UnknownOperationMode(9))
        );
    }

    #[test]
    fn should_parse_fan_speed_by_name() {
        assert_eq!("Auto".parse::<FanSpeed>(), Ok(FanSpeed::Auto));
        assert_eq!("Level7".parse::<FanSpeed>(), Ok(FanSpeed::Level7));
        assert!("level7".parse::<FanSpeed>().is_err());
    }

    #[test]
    fn should_look_up_fan_speed_by_value() {
        assert_eq!(FanSpeed::from_value(3), Some(FanSpeed::Level3));
        assert_eq!(FanSpeed::from_value(8), None);
    }

    #[test]
    fn should_list_fan_speeds_in_protocol_order() {
        let values: Vec<u8> = FanSpeed::ALL.iter().map(|s| s.value()).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn should_serialize_snapshot_with_raw_mode_and_named_fan_speed() {
        let snapshot = StatusSnapshot {
            mode: OperationMode::Heat,
            fan_speed: FanSpeed::Level2,
            ..StatusSnapshot::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["mode"], 5);
        assert_eq!(json["fan_speed"], "Level2");
    }

    #[test]
    fn should_recognise_ok_sentinel_only() {
        assert!(CommandReply::ok().is_success());
        assert!(!CommandReply::new(serde_json::json!(["error"])).is_success());
        assert!(!CommandReply::new(serde_json::json!("ok")).is_success());
        assert!(!CommandReply::new(serde_json::json!([])).is_success());
    }
}
