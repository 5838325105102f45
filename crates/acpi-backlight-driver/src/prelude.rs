//! Prelude for acpi-backlight-driver.

pub use crate::config::{PanelConfig, PanelConfigBuilder};
pub use crate::error::{DriverError, DriverResult};
pub use crate::panel::PanelSnapshot;
pub use crate::params::{DisplayParameter, ParameterSet};
pub use crate::properties::{PropertyKey, PropertyMap};
pub use crate::work::WorkRequest;
pub use crate::worker::BacklightDriver;
