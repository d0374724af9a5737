//! # miotac-domain
//!
//! Pure domain model for the Xiaomi MIoT air-conditioner integration.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Describe the **device side**: device info, access token, supported
//!   models and the immutable [`StatusSnapshot`](status::StatusSnapshot)
//! - Describe the **host side**: climate modes, switch kinds, entities,
//!   services and events
//! - Hold the translation tables between both sides, including the
//!   half-degree target-temperature rounding rule
//! - Persisted **config entries** describing configured devices
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod climate;
pub mod config_entry;
pub mod device;
pub mod entity;
pub mod event;
pub mod model;
pub mod service;
pub mod status;
pub mod switch;
