//! Climate: how the unit is presented to the host as a climate entity.
//!
//! Holds the HVAC/swing mode tables, the temperature limits and the
//! half-degree rounding rule applied to every requested target temperature.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::AttributeValue;
use crate::error::ValidationError;
use crate::status::{OperationMode, StatusSnapshot};

pub const MIN_TEMPERATURE: f64 = 16.0;
pub const MAX_TEMPERATURE: f64 = 31.0;
pub const TARGET_TEMPERATURE_STEP: f64 = 0.5;
pub const TEMPERATURE_UNIT: &str = "°C";
pub const ICON: &str = "mdi:air-conditioner";

/// Supported-feature bit flags.
pub const SUPPORT_TARGET_TEMPERATURE: u32 = 1;
pub const SUPPORT_FAN_MODE: u32 = 8;
pub const SUPPORT_SWING_MODE: u32 = 32;
pub const SUPPORT_AUX_HEAT: u32 = 64;

pub const SUPPORTED_FEATURES: u32 =
    SUPPORT_TARGET_TEMPERATURE | SUPPORT_FAN_MODE | SUPPORT_SWING_MODE | SUPPORT_AUX_HEAT;

/// Host-side operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Dry,
    FanOnly,
}

/// HVAC modes offered to the host, in display order.
pub const SUPPORTED_HVAC_MODES: [HvacMode; 5] = [
    HvacMode::Cool,
    HvacMode::Dry,
    HvacMode::FanOnly,
    HvacMode::Heat,
    HvacMode::Off,
];

impl HvacMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Dry => "dry",
            Self::FanOnly => "fan_only",
        }
    }

    /// Device mode for this HVAC mode. `Off` is a power state, not a mode.
    #[must_use]
    pub fn to_operation_mode(self) -> Option<OperationMode> {
        match self {
            Self::Off => None,
            Self::Heat => Some(OperationMode::Heat),
            Self::Cool => Some(OperationMode::Cool),
            Self::Dry => Some(OperationMode::Dry),
            Self::FanOnly => Some(OperationMode::Fan),
        }
    }

    /// HVAC mode reported for a snapshot: `Off` when powered down.
    #[must_use]
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        if snapshot.is_on() {
            snapshot.mode.into()
        } else {
            Self::Off
        }
    }
}

impl From<OperationMode> for HvacMode {
    fn from(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Cool => Self::Cool,
            OperationMode::Dry => Self::Dry,
            OperationMode::Fan => Self::FanOnly,
            OperationMode::Heat => Self::Heat,
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HvacMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED_HVAC_MODES
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownHvacMode(s.to_string()))
    }
}

/// Louvre swing mode. Only vertical swing is supported by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingMode {
    Off,
    Vertical,
}

pub const SUPPORTED_SWING_MODES: [SwingMode; 2] = [SwingMode::Off, SwingMode::Vertical];

impl SwingMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Vertical => "vertical",
        }
    }

    #[must_use]
    pub fn from_vertical_swing(vertical_swing: bool) -> Self {
        if vertical_swing {
            Self::Vertical
        } else {
            Self::Off
        }
    }

    #[must_use]
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Vertical)
    }
}

impl fmt::Display for SwingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "vertical" => Ok(Self::Vertical),
            other => Err(ValidationError::UnknownSwingMode(other.to_string())),
        }
    }
}

/// Round a requested temperature to the half-degree grid the unit accepts.
///
/// Fractional part below `0.25` rounds down, below `0.75` goes to the half
/// degree, anything above rounds up to the next whole degree.
#[must_use]
pub fn round_target_temperature(value: f64) -> f64 {
    let whole = value.floor();
    let fraction = value - whole;
    if fraction < 0.25 {
        whole
    } else if fraction < 0.75 {
        whole + 0.5
    } else {
        whole + 1.0
    }
}

/// State attributes of the climate entity for one snapshot.
#[must_use]
pub fn climate_attributes(snapshot: &StatusSnapshot) -> BTreeMap<String, AttributeValue> {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        "current_temperature".to_string(),
        AttributeValue::Float(snapshot.temperature),
    );
    attributes.insert(
        "fan_speed".to_string(),
        AttributeValue::Int(i64::from(snapshot.fan_speed.value())),
    );
    attributes.insert(
        "fan_speed_percent".to_string(),
        AttributeValue::Int(i64::from(snapshot.fan_speed_percent)),
    );
    attributes.insert("heater".to_string(), AttributeValue::Bool(snapshot.heater));
    attributes.insert(
        "mode".to_string(),
        AttributeValue::Int(i64::from(snapshot.mode.value())),
    );
    attributes.insert(
        "target_temperature".to_string(),
        AttributeValue::Float(snapshot.target_temperature),
    );
    attributes.insert(
        "temperature".to_string(),
        AttributeValue::Float(snapshot.target_temperature),
    );
    attributes.insert(
        "vertical_swing".to_string(),
        AttributeValue::Bool(snapshot.vertical_swing),
    );
    attributes
}
