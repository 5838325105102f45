//! # acpi-backlight-driver
//!
//! Drives one ACPI backlight panel: discovers the device, maps the OS's
//! `[0, 1024]` brightness scale onto the firmware's level table, fades between
//! levels, persists the committed level and exposes the display-parameter and
//! property surfaces.
//!
//! - [`worker`] - [`BacklightDriver`], the handle to a panel's worker thread
//! - [`panel`] - [`Panel`], the single-threaded state the worker owns
//! - [`config`] - [`PanelConfig`]
//! - [`params`] - the `brightness`/`commit` display parameters
//! - [`properties`] - property keys and the published property map
//! - [`work`] - the coalescing deferred-work queue
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use acpi_backlight_driver::prelude::*;
//! use acpi_backlight_firmware::{NodeHandle, VirtualNode};
//! use acpi_backlight_nvram::{MemoryStore, PersistenceConfig, StaticLocator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let panel = VirtualNode::builder("DD02")
//!     .backlight([5u32, 95, 10, 20, 30, 40])
//!     .build();
//! let root: NodeHandle = VirtualNode::builder("GFX0").control().child(panel.clone()).build();
//! let provider: NodeHandle = VirtualNode::builder("PNLF").build();
//!
//! let config = PanelConfig::builder()
//!     .persistence(PersistenceConfig { wait_timeout_ms: 0, ..PersistenceConfig::default() })
//!     .build()?;
//! let locator = Arc::new(StaticLocator::new(Arc::new(MemoryStore::new())));
//! let driver = BacklightDriver::attach(&provider, &root, locator, config)?;
//!
//! driver.set_brightness(1024)?;
//! driver.commit()?;
//! let state = driver.detach()?;
//! assert_eq!(state.fade.committed, 1024);
//! assert_eq!(panel.current_raw(), 40);
//! # Ok(())
//! # }
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

pub mod config;
pub mod error;
pub mod panel;
pub mod params;
pub mod properties;
pub mod work;
pub mod worker;

#[cfg(feature = "diagnostics")]
#[cfg_attr(docsrs, doc(cfg(feature = "diagnostics")))]
pub mod diagnostics;

pub mod prelude;

pub use config::{PanelConfig, PanelConfigBuilder};
pub use error::{DriverError, DriverResult};
pub use panel::{Panel, PanelSnapshot};
pub use params::{DisplayParameter, ParameterRange, ParameterSet};
pub use properties::{PropertyKey, PropertyMap};
pub use work::{WorkQueue, WorkRequest};
pub use worker::BacklightDriver;
