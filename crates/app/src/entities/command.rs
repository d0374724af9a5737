//! Write path shared by every entity.

use std::sync::Arc;

use miotac_domain::error::DeviceError;
use miotac_domain::status::CommandReply;

use crate::executor::run_blocking;
use crate::ports::MiotDevice;

/// An entity that sends commands to its device.
pub trait CommandTarget: Send + Sync {
    type Device: MiotDevice;

    fn entity_id(&self) -> &str;

    fn device(&self) -> &Arc<Self::Device>;

    /// Drop availability until the next successful read.
    fn mark_unavailable(&self);
}

/// Send one command and report whether the unit accepted it.
///
/// A refusal (any reply but `["ok"]`) and a communication error are handled
/// alike: `description` is logged at error level and `target` loses
/// availability right away, independently of its read-path retry counter.
pub async fn try_command<T, F>(target: &T, description: &str, command: F) -> bool
where
    T: CommandTarget,
    F: FnOnce(&T::Device) -> Result<CommandReply, DeviceError> + Send + 'static,
{
    match run_blocking(target.device(), command).await {
        Ok(reply) if reply.is_success() => {
            tracing::debug!(entity_id = %target.entity_id(), reply = %reply, "command accepted");
            true
        }
        Ok(reply) => {
            tracing::error!(entity_id = %target.entity_id(), reply = %reply, "{description}");
            target.mark_unavailable();
            false
        }
        Err(error) => {
            tracing::error!(entity_id = %target.entity_id(), error = %error, "{description}");
            target.mark_unavailable();
            false
        }
    }
}
