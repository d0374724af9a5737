//! Config entry: one configured air conditioner, as persisted.

use serde::{Deserialize, Serialize};

use crate::device::Token;
use crate::error::{MiotError, ValidationError};
use crate::id::EntryId;
use crate::time::{Timestamp, now};

/// Number of consecutive failed reads tolerated before an entity is marked
/// unavailable, when the user does not choose one.
pub const DEFAULT_RETRIES: u32 = 10;

/// User-provided connection settings of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    pub host: String,
    pub token: Token,
    pub name: String,
    pub retries: u32,
}

impl EntryData {
    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the host or name is blank or when
    /// `retries` is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.retries == 0 {
            return Err(ValidationError::InvalidRetries);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: EntryId,
    /// `<model>-<mac address>` of the unit, unique across entries.
    pub unique_id: String,
    pub title: String,
    pub data: EntryData,
    pub created_at: Timestamp,
}

impl ConfigEntry {
    /// Create a new entry titled after the configured name.
    ///
    /// # Errors
    ///
    /// Returns [`MiotError::Validation`] when `data` is invalid.
    pub fn new(unique_id: impl Into<String>, data: EntryData) -> Result<Self, MiotError> {
        data.validate()?;
        Ok(Self {
            entry_id: EntryId::new(),
            unique_id: unique_id.into(),
            title: data.name.clone(),
            data,
            created_at: now(),
        })
    }
}
