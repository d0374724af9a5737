//! Auxiliary boolean switches exposed next to the climate entity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::status::StatusSnapshot;

/// One of the six on/off features of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    Buzzer,
    Clean,
    Dryer,
    Eco,
    Led,
    SleepMode,
}

impl SwitchKind {
    pub const ALL: [Self; 6] = [
        Self::Buzzer,
        Self::Clean,
        Self::Dryer,
        Self::Eco,
        Self::Led,
        Self::SleepMode,
    ];

    /// Key used in entity and unique ids.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Buzzer => "buzzer",
            Self::Clean => "clean",
            Self::Dryer => "dryer",
            Self::Eco => "eco",
            Self::Led => "led",
            Self::SleepMode => "sleep_mode",
        }
    }

    /// Appended to the device name to form the friendly name.
    #[must_use]
    pub fn name_suffix(self) -> &'static str {
        match self {
            Self::Buzzer => "buzzer",
            Self::Clean => "clean mode",
            Self::Dryer => "dryer mode",
            Self::Eco => "eco mode",
            Self::Led => "LED enabled",
            Self::SleepMode => "sleep mode",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Buzzer => "mdi:bell-ring",
            Self::Clean => "mdi:broom",
            Self::Dryer => "mdi:water-off",
            Self::Eco => "mdi:flash",
            Self::Led => "mdi:lightbulb",
            Self::SleepMode => "mdi:power-sleep",
        }
    }

    /// Read this switch's slice of a snapshot.
    #[must_use]
    pub fn is_on(self, snapshot: &StatusSnapshot) -> bool {
        match self {
            Self::Buzzer => snapshot.buzzer,
            Self::Clean => snapshot.clean.cleaning,
            Self::Dryer => snapshot.dryer,
            Self::Eco => snapshot.eco,
            Self::Led => snapshot.led,
            Self::SleepMode => snapshot.sleep_mode,
        }
    }
}

impl fmt::Display for SwitchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SwitchKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| ValidationError::UnknownSwitch(s.to_string()))
    }
}
