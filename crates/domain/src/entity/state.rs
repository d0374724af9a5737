//! Entity state: the single value the host displays for an entity.

use serde::{Deserialize, Serialize};

use crate::climate::HvacMode;

/// Discrete state of an entity. Switches are `on`/`off`; the climate entity
/// reports its HVAC mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    On,
    Off,
    Heat,
    Cool,
    Dry,
    FanOnly,
    #[default]
    Unknown,
    Unavailable,
}

impl EntityState {
    /// Whether the entity is reachable (anything but [`Unavailable`](Self::Unavailable)).
    #[must_use]
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    #[must_use]
    pub fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Dry => "dry",
            Self::FanOnly => "fan_only",
            Self::Unknown => "unknown",
            Self::Unavailable => "unavailable",
        }
    }
}

impl From<HvacMode> for EntityState {
    fn from(mode: HvacMode) -> Self {
        match mode {
            HvacMode::Off => Self::Off,
            HvacMode::Heat => Self::Heat,
            HvacMode::Cool => Self::Cool,
            HvacMode::Dry => Self::Dry,
            HvacMode::FanOnly => Self::FanOnly,
        }
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
