//! # acpi-backlight-firmware
//!
//! The firmware side of an ACPI backlight: a [`FirmwareNode`] trait for the
//! firmware namespace, capability probing, discovery of the control and
//! backlight nodes, and [`BacklightDevice`], the typed wrapper the driver calls.
//!
//! [`VirtualNode`] is an in-memory implementation that records every call. The
//! driver tests and the `backlightctl` simulator run on it.
//!
//! ## Example
//!
//! ```rust
//! use acpi_backlight_firmware::prelude::*;
//!
//! let lcd = VirtualNode::builder("DD02")
//!     .backlight([40u32, 10, 10, 20, 30, 40])
//!     .build();
//! let gfx = VirtualNode::builder("GFX0").control().child(lcd.clone()).build();
//! let root: NodeHandle = VirtualNode::builder("_SB").child(gfx).build();
//! let provider: NodeHandle = VirtualNode::builder("PNLF").build();
//!
//! let device = discover(&provider, &root)?;
//! assert_eq!(device.backlight_path(), "_SB.GFX0.DD02");
//!
//! device.apply_level(30)?;
//! assert_eq!(lcd.current_raw(), 30);
//! # Ok::<(), FirmwareError>(())
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod capability;
pub mod device;
pub mod discovery;
pub mod error;
pub mod method;
pub mod node;
pub mod virtual_node;

pub mod prelude;

pub use capability::{DeviceCapability, DeviceOptions, MethodSet, backlight_method_set};
pub use device::{BacklightDevice, SOFTWARE_CONTROL_MODE};
pub use discovery::discover;
pub use error::{FirmwareError, FirmwareResult};
pub use method::FirmwareMethod;
pub use node::{FirmwareNode, FirmwareValue, NodeHandle};
pub use virtual_node::{VirtualNode, VirtualNodeBuilder};
