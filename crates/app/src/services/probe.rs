//! Connectivity probe: one info query, then the model allow-list.

use std::sync::Arc;

use miotac_domain::device::DeviceInfo;
use miotac_domain::error::DeviceError;
use miotac_domain::model;

use crate::executor::run_blocking;
use crate::ports::MiotDevice;

/// What a successful probe learned about the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub model: String,
    /// `<model>-<mac address>`.
    pub unique_id: String,
    pub info: DeviceInfo,
}

pub const ERROR_PLATFORM_NOT_READY: &str = "platform_not_ready";
pub const ERROR_UNSUPPORTED_DEVICE: &str = "unsupported_device";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("device is not reachable: {0}")]
    Offline(#[source] DeviceError),
    #[error("unsupported device model {0}")]
    Unsupported(String),
}

impl ProbeError {
    /// Key reported to the config flow form.
    #[must_use]
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::Offline(_) => ERROR_PLATFORM_NOT_READY,
            Self::Unsupported(_) => ERROR_UNSUPPORTED_DEVICE,
        }
    }
}

/// Query the unit once and check that its model is supported.
///
/// # Errors
///
/// Returns [`ProbeError::Offline`] when the info query fails and
/// [`ProbeError::Unsupported`] when the model is not on the allow-list.
#[tracing::instrument(skip(device))]
pub async fn check_device<D: MiotDevice>(
    device: &Arc<D>,
    host: &str,
) -> Result<ProbeResult, ProbeError> {
    let info = run_blocking(device, D::info)
        .await
        .map_err(ProbeError::Offline)?;
    if !model::is_supported(&info.model) {
        tracing::error!(
            model = %info.model,
            "unsupported device found; open an issue to get it added"
        );
        return Err(ProbeError::Unsupported(info.model));
    }
    tracing::info!(
        model = %info.model,
        firmware = %info.firmware_version,
        hardware = %info.hardware_version,
        "device detected"
    );
    Ok(ProbeResult {
        model: info.model.clone(),
        unique_id: model::unique_id(&info.model, &info.mac_address),
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MAC, StubDevice};

    #[tokio::test]
    async fn should_return_unique_id_for_supported_model() {
        let device = Arc::new(StubDevice::with_model("xiaomi.aircondition.mc5"));

        let result = check_device(&device, "192.168.1.20").await.unwrap();

        assert_eq!(result.model, "xiaomi.aircondition.mc5");
        assert_eq!(result.unique_id, format!("xiaomi.aircondition.mc5-{MAC}"));
        assert_eq!(result.info.firmware_version, "2.1.3");
    }

    #[tokio::test]
    async fn should_reject_unsupported_model() {
        let device = Arc::new(StubDevice::with_model("xiaomi.aircondition.ma2"));

        let error = check_device(&device, "192.168.1.20").await.unwrap_err();

        assert_eq!(
            error,
            ProbeError::Unsupported("xiaomi.aircondition.ma2".to_string())
        );
        assert_eq!(error.error_key(), "unsupported_device");
    }

    #[tokio::test]
    async fn should_report_offline_device_as_not_ready() {
        let device = Arc::new(StubDevice::offline());

        let error = check_device(&device, "192.168.1.20").await.unwrap_err();

        assert_eq!(error, ProbeError::Offline(DeviceError::Timeout));
        assert_eq!(error.error_key(), "platform_not_ready");
    }
}
