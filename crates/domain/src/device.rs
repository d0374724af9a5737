//! Device: the physical air conditioner behind one config entry.
//!
//! The device client hands back a [`DeviceInfo`] when probed; entities
//! describe the unit to the host through a [`DeviceDescriptor`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Integration domain, used in device identifiers.
pub const DOMAIN: &str = "xiaomi_miot_air_conditioner";

/// Manufacturer reported for every supported unit.
pub const MANUFACTURER: &str = "Xiaomi";

const TOKEN_LEN: usize = 32;

/// The 128-bit shared secret used to talk to a unit, as 32 hex characters.
///
/// `Debug` and `Display` only show the first four characters so the secret
/// never ends up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Validate and normalise (lower-case) a token.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidToken`] unless `value` is exactly
    /// 32 hexadecimal characters.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if value.len() != TOKEN_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidToken);
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// The full secret, for handing to the device client.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> String {
        format!("{}…", &self.0[..4])
    }
}

impl TryFrom<String> for Token {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.redacted()).finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Identity reported by the unit in answer to an info query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub firmware_version: String,
    pub hardware_version: String,
    pub mac_address: String,
}

/// How entities describe their device to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
    pub hw_version: String,
    /// `(domain, unique_id)` pairs identifying the device.
    pub identifiers: Vec<(String, String)>,
}

impl DeviceDescriptor {
    /// Describe the unit identified by `unique_id` from its probed info.
    #[must_use]
    pub fn new(unique_id: &str, info: &DeviceInfo) -> Self {
        Self {
            name: info.model.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: info.model.clone(),
            sw_version: info.firmware_version.clone(),
            hw_version: info.hardware_version.clone(),
            identifiers: vec![(DOMAIN.to_string(), unique_id.to_string())],
        }
    }
}
