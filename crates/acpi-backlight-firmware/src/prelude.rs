//! Prelude for acpi-backlight-firmware.

pub use crate::capability::{DeviceCapability, DeviceOptions, MethodSet};
pub use crate::device::BacklightDevice;
pub use crate::discovery::discover;
pub use crate::error::{FirmwareError, FirmwareResult};
pub use crate::method::FirmwareMethod;
pub use crate::node::{FirmwareNode, FirmwareValue, NodeHandle};
pub use crate::virtual_node::VirtualNode;
