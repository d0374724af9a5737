//! Service: a callable command addressed to climate or switch entities.
//!
//! A raw call (`domain`, `service`, JSON data) is validated once into a typed
//! [`ServiceCall`]; dispatch never looks at the JSON again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::climate::{HvacMode, SwingMode};
use crate::error::ValidationError;
use crate::status::FanSpeed;

pub const CLIMATE_DOMAIN: &str = "climate";
pub const SWITCH_DOMAIN: &str = "switch";

pub const SERVICE_SET_FAN_SPEED_PERCENT: &str = "miot_ac_set_fan_speed_percent";
pub const SERVICE_SET_DELAY_ON_TIMER: &str = "miot_ac_set_delay_on_timer";
pub const SERVICE_SET_DELAY_OFF_TIMER: &str = "miot_ac_set_delay_off_timer";
pub const SERVICE_CANCEL_TIMER: &str = "miot_ac_cancel_timer";

pub const ATTR_ENTITY_ID: &str = "entity_id";
pub const ATTR_TEMPERATURE: &str = "temperature";
pub const ATTR_HVAC_MODE: &str = "hvac_mode";
pub const ATTR_FAN_MODE: &str = "fan_mode";
pub const ATTR_SWING_MODE: &str = "swing_mode";
pub const ATTR_FAN_SPEED_PERCENT: &str = "fan_speed_percent";
pub const ATTR_TIMER_MINUTES: &str = "minutes";

pub const FAN_SPEED_PERCENT_MIN: u8 = 1;
pub const FAN_SPEED_PERCENT_MAX: u8 = 101;
pub const TIMER_MINUTES_MIN: u16 = 0;
pub const TIMER_MINUTES_MAX: u16 = 720;

/// Climate-domain services, with their validated parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClimateService {
    SetTemperature(f64),
    SetHvacMode(HvacMode),
    SetFanMode(FanSpeed),
    SetSwingMode(SwingMode),
    TurnAuxHeatOn,
    TurnAuxHeatOff,
    TurnOn,
    TurnOff,
    SetFanSpeedPercent(u8),
    SetDelayOnTimer(u16),
    SetDelayOffTimer(u16),
    CancelTimer,
}

impl ClimateService {
    /// Every service name registered under the climate domain.
    pub const NAMES: [&'static str; 12] = [
        "set_temperature",
        "set_hvac_mode",
        "set_fan_mode",
        "set_swing_mode",
        "turn_aux_heat_on",
        "turn_aux_heat_off",
        "turn_on",
        "turn_off",
        SERVICE_SET_FAN_SPEED_PERCENT,
        SERVICE_SET_DELAY_ON_TIMER,
        SERVICE_SET_DELAY_OFF_TIMER,
        SERVICE_CANCEL_TIMER,
    ];

    fn parse(service: &str, data: &Value) -> Option<Result<Self, ValidationError>> {
        let parsed = match service {
            "set_temperature" => float_field(data, ATTR_TEMPERATURE).map(Self::SetTemperature),
            "set_hvac_mode" => str_field(data, ATTR_HVAC_MODE)
                .and_then(str::parse)
                .map(Self::SetHvacMode),
            "set_fan_mode" => str_field(data, ATTR_FAN_MODE)
                .and_then(str::parse)
                .map(Self::SetFanMode),
            "set_swing_mode" => str_field(data, ATTR_SWING_MODE)
                .and_then(str::parse)
                .map(Self::SetSwingMode),
            "turn_aux_heat_on" => Ok(Self::TurnAuxHeatOn),
            "turn_aux_heat_off" => Ok(Self::TurnAuxHeatOff),
            "turn_on" => Ok(Self::TurnOn),
            "turn_off" => Ok(Self::TurnOff),
            SERVICE_SET_FAN_SPEED_PERCENT => ranged_field(
                data,
                ATTR_FAN_SPEED_PERCENT,
                FAN_SPEED_PERCENT_MIN,
                FAN_SPEED_PERCENT_MAX,
            )
            .map(Self::SetFanSpeedPercent),
            SERVICE_SET_DELAY_ON_TIMER => {
                ranged_field(data, ATTR_TIMER_MINUTES, TIMER_MINUTES_MIN, TIMER_MINUTES_MAX)
                    .map(Self::SetDelayOnTimer)
            }
            SERVICE_SET_DELAY_OFF_TIMER => {
                ranged_field(data, ATTR_TIMER_MINUTES, TIMER_MINUTES_MIN, TIMER_MINUTES_MAX)
                    .map(Self::SetDelayOffTimer)
            }
            SERVICE_CANCEL_TIMER => Ok(Self::CancelTimer),
            _ => return None,
        };
        Some(parsed)
    }
}

/// Switch-domain services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchService {
    TurnOn,
    TurnOff,
    Toggle,
}

impl SwitchService {
    pub const NAMES: [&'static str; 3] = ["turn_on", "turn_off", "toggle"];

    fn parse(service: &str) -> Option<Self> {
        match service {
            "turn_on" => Some(Self::TurnOn),
            "turn_off" => Some(Self::TurnOff),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServiceAction {
    Climate(ClimateService),
    Switch(SwitchService),
}

/// A validated service call.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub action: ServiceAction,
    /// Entities the call is scoped to; `None` targets every device.
    pub entity_ids: Option<Vec<String>>,
}

impl ServiceCall {
    /// Validate a raw service call.
    ///
    /// Integer parameters accept JSON integers, floats (truncated) and
    /// numeric strings, and are rejected outside their range. `entity_id`
    /// may be a string (comma separated) or a list of strings.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownService`] for a service that is not
    /// registered under `domain`, or the first schema violation found in
    /// `data`. Switch services must name at least one entity.
    pub fn parse(domain: &str, service: &str, data: &Value) -> Result<Self, ValidationError> {
        let unknown = || ValidationError::UnknownService {
            domain: domain.to_string(),
            service: service.to_string(),
        };
        if !data.is_null() && !data.is_object() {
            return Err(ValidationError::InvalidType {
                field: "data",
                expected: "an object",
            });
        }
        let entity_ids = entity_ids(data)?;
        let action = match domain {
            CLIMATE_DOMAIN => {
                ServiceAction::Climate(ClimateService::parse(service, data).ok_or_else(unknown)??)
            }
            SWITCH_DOMAIN => {
                let action = SwitchService::parse(service).ok_or_else(unknown)?;
                if entity_ids.is_none() {
                    return Err(ValidationError::MissingField(ATTR_ENTITY_ID));
                }
                ServiceAction::Switch(action)
            }
            _ => return Err(unknown()),
        };
        Ok(Self { action, entity_ids })
    }

    /// Whether the call addresses `entity_id`.
    #[must_use]
    pub fn targets(&self, entity_id: &str) -> bool {
        self.entity_ids
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|id| id == entity_id))
    }
}

/// Outcome of a service call for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResult {
    pub entity_id: String,
    pub success: bool,
}

fn field<'a>(data: &'a Value, name: &'static str) -> Result<&'a Value, ValidationError> {
    match data.get(name) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(name)),
        Some(value) => Ok(value),
    }
}

fn str_field<'a>(data: &'a Value, name: &'static str) -> Result<&'a str, ValidationError> {
    field(data, name)?
        .as_str()
        .ok_or(ValidationError::InvalidType {
            field: name,
            expected: "a string",
        })
}

fn float_field(data: &Value, name: &'static str) -> Result<f64, ValidationError> {
    let invalid = ValidationError::InvalidType {
        field: name,
        expected: "a number",
    };
    let value = match field(data, name)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite()).ok_or(invalid)
}

#[allow(clippy::cast_possible_truncation)]
fn int_field(data: &Value, name: &'static str) -> Result<i64, ValidationError> {
    let invalid = ValidationError::InvalidType {
        field: name,
        expected: "an integer",
    };
    match field(data, name)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
            .ok_or(invalid),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| {
                    text.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .map(|v| v as i64)
                })
                .ok_or(invalid)
        }
        _ => Err(invalid),
    }
}

fn ranged_field<T>(data: &Value, name: &'static str, min: T, max: T) -> Result<T, ValidationError>
where
    T: Into<i64> + TryFrom<i64> + Copy,
{
    let value = int_field(data, name)?;
    let (lo, hi) = (min.into(), max.into());
    if value < lo || value > hi {
        return Err(ValidationError::OutOfRange {
            field: name,
            min: lo,
            max: hi,
            actual: value,
        });
    }
    T::try_from(value).map_err(|_| ValidationError::OutOfRange {
        field: name,
        min: lo,
        max: hi,
        actual: value,
    })
}

fn entity_ids(data: &Value) -> Result<Option<Vec<String>>, ValidationError> {
    let invalid = ValidationError::InvalidType {
        field: ATTR_ENTITY_ID,
        expected: "a string or a list of strings",
    };
    let ids: Vec<&str> = match data.get(ATTR_ENTITY_ID) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(ids)) => ids.split(',').collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(Value::as_str)
            .collect::<Option<_>>()
            .ok_or(invalid)?,
        Some(_) => return Err(invalid),
    };
    // an empty scope addresses every entity
    let ids: Vec<String> = ids
        .into_iter()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(ids).filter(|ids| !ids.is_empty()))
}
