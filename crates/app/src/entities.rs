//! Host-facing entities backed by a shared device handle.

pub mod climate;
pub mod command;
pub mod switch;

pub use climate::ClimateEntity;
pub use command::{CommandTarget, try_command};
pub use switch::SwitchEntity;

use miotac_domain::entity::slugify;

/// Object id shared by every entity of a device: the slug of its name, or of
/// its unique id when the name has no usable characters.
pub(crate) fn object_id(name: &str, device_unique_id: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        slugify(device_unique_id)
    } else {
        slug
    }
}
