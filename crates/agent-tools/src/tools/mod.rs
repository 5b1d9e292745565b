//! Built-in tool implementations.

mod check_extension_status;

pub use check_extension_status::{CheckExtensionStatus, DeviceStateResult};
