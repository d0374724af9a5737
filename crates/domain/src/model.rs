//! Supported air-conditioner models.

pub const MODEL_AIRCONDITION_MC1: &str = "xiaomi.aircondition.mc1";
pub const MODEL_AIRCONDITION_MC2: &str = "xiaomi.aircondition.mc2";
pub const MODEL_AIRCONDITION_MC4: &str = "xiaomi.aircondition.mc4";
pub const MODEL_AIRCONDITION_MC5: &str = "xiaomi.aircondition.mc5";

/// Models this integration knows how to drive.
pub const SUPPORTED_MODELS: [&str; 4] = [
    MODEL_AIRCONDITION_MC1,
    MODEL_AIRCONDITION_MC2,
    MODEL_AIRCONDITION_MC4,
    MODEL_AIRCONDITION_MC5,
];

/// Whether `model` is on the allow-list.
#[must_use]
pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

/// Stable identifier of a unit: `<model>-<mac address>`.
#[must_use]
pub fn unique_id(model: &str, mac_address: &str) -> String {
    format!("{model}-{mac_address}")
}
