//! # miotac-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `MiotDevice` / `DeviceConnector`: the blocking device client
//!   - `ConfigEntryRepository`: persistence of configured devices
//!   - `EventPublisher`: fan-out of domain events
//! - Define the **driving port** `Integration`, consumed by the HTTP adapter
//! - Run blocking device calls off the async scheduler
//! - Poll devices with a bounded consecutive-failure counter and track
//!   availability (`polling`)
//! - Present one climate entity and six switch entities per device
//!   (`entities`)
//! - Probe devices, run the config flow, dispatch services and manage the
//!   lifecycle of config entries (`services`)
//! - Provide the in-process event bus
//!
//! ## Dependency rule
//! Depends on `miotac-domain` only (plus `tokio` for tasks, timers and
//! channels). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod entities;
pub mod event_bus;
pub mod executor;
pub mod polling;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
