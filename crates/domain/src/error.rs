//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`MiotError`]
//! via `#[from]` when crossing a port boundary.

/// Top-level error shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum MiotError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("device communication error")]
    Device(#[from] DeviceError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Violated domain invariant or rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("host must not be empty")]
    EmptyHost,

    #[error("entity id must not be empty")]
    EmptyEntityId,

    #[error("entity id {0:?} must look like <domain>.<object_id>")]
    InvalidEntityId(String),

    #[error("token must be 32 hexadecimal characters")]
    InvalidToken,

    #[error("retries must be at least 1")]
    InvalidRetries,

    #[error("missing required field {0:?}")]
    MissingField(&'static str),

    #[error("field {field:?} must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field {field:?} must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("unknown operation mode value {0}")]
    UnknownOperationMode(u8),

    #[error("unknown fan speed {0:?}")]
    UnknownFanSpeed(String),

    #[error("unknown hvac mode {0:?}")]
    UnknownHvacMode(String),

    #[error("unknown swing mode {0:?}")]
    UnknownSwingMode(String),

    #[error("unknown switch {0:?}")]
    UnknownSwitch(String),

    #[error("unknown service {domain}.{service}")]
    UnknownService { domain: String, service: String },
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure reported by the device client while talking to the unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device at {host} is unreachable")]
    Unreachable { host: String },

    #[error("device did not answer in time")]
    Timeout,

    #[error("device replied with error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("device call was interrupted before completion")]
    Interrupted,
}
