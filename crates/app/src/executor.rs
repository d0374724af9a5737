//! Runs blocking device-client calls on tokio's blocking pool.

use std::sync::Arc;

use miotac_domain::error::DeviceError;

use crate::ports::MiotDevice;

/// Run `call` against `device` on the blocking pool and await its result.
///
/// # Errors
///
/// Returns whatever `call` returns, or [`DeviceError::Interrupted`] when the
/// blocking task panicked or was cancelled.
pub async fn run_blocking<D, T, F>(device: &Arc<D>, call: F) -> Result<T, DeviceError>
where
    D: MiotDevice,
    T: Send + 'static,
    F: FnOnce(&D) -> Result<T, DeviceError> + Send + 'static,
{
    let device = Arc::clone(device);
    match tokio::task::spawn_blocking(move || call(&device)).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "blocking device call did not complete");
            Err(DeviceError::Interrupted)
        }
    }
}
