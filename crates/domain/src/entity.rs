//! Entity: the host-facing view of one controllable aspect of the unit.
//!
//! Each configured air conditioner exposes one climate entity and six switch
//! entities. Entities are rebuilt from the latest snapshot whenever the outside
//! world asks for them; they hold no live state of their own.

mod attribute_value;
mod state;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use self::attribute_value::AttributeValue;
pub use self::state::EntityState;

use crate::device::DeviceDescriptor;
use crate::error::{MiotError, ValidationError};
use crate::time::{Timestamp, now};

/// Serialisable view of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// `<domain>.<object_id>`, e.g. `climate.bedroom` or `switch.bedroom_eco`.
    pub entity_id: String,
    pub unique_id: String,
    pub friendly_name: String,
    pub icon: Option<String>,
    pub state: EntityState,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub available: bool,
    pub device: Option<DeviceDescriptor>,
    pub last_updated: Timestamp,
}

impl Entity {
    /// Create a builder for constructing an [`Entity`].
    #[must_use]
    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    /// Domain part of the entity id (`climate`, `switch`).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }

    /// Look up an attribute by key.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MiotError::Validation`] when the entity id is empty or not of
    /// the `<domain>.<object_id>` form, or when the friendly name is empty.
    pub fn validate(&self) -> Result<(), MiotError> {
        if self.entity_id.is_empty() {
            return Err(ValidationError::EmptyEntityId.into());
        }
        match self.entity_id.split_once('.') {
            Some((domain, object_id)) if !domain.is_empty() && !object_id.is_empty() => {}
            _ => return Err(ValidationError::InvalidEntityId(self.entity_id.clone()).into()),
        }
        if self.friendly_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Turn a display name into an entity object id: lower-case ASCII
/// alphanumerics joined by single underscores.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Step-by-step builder for [`Entity`].
#[derive(Debug, Default)]
pub struct EntityBuilder {
    entity_id: Option<String>,
    unique_id: Option<String>,
    friendly_name: Option<String>,
    icon: Option<String>,
    state: EntityState,
    attributes: BTreeMap<String, AttributeValue>,
    available: bool,
    device: Option<DeviceDescriptor>,
    last_updated: Option<Timestamp>,
}

impl EntityBuilder {
    #[must_use]
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    #[must_use]
    pub fn friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn state(mut self, state: EntityState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn attributes(mut self, attributes: BTreeMap<String, AttributeValue>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    #[must_use]
    pub fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    #[must_use]
    pub fn device(mut self, device: DeviceDescriptor) -> Self {
        self.device = Some(device);
        self
    }

    #[must_use]
    pub fn last_updated(mut self, ts: Timestamp) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`Entity`].
    ///
    /// An unavailable entity always reports [`EntityState::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`MiotError::Validation`] if the entity id or friendly name is
    /// missing or malformed.
    pub fn build(self) -> Result<Entity, MiotError> {
        let state = if self.available {
            self.state
        } else {
            EntityState::Unavailable
        };
        let entity = Entity {
            entity_id: self.entity_id.unwrap_or_default(),
            unique_id: self.unique_id.unwrap_or_default(),
            friendly_name: self.friendly_name.unwrap_or_default(),
            icon: self.icon,
            state,
            attributes: self.attributes,
            available: self.available,
            device: self.device,
            last_updated: self.last_updated.unwrap_or_else(now),
        };
        entity.validate()?;
        Ok(entity)
    }
}
