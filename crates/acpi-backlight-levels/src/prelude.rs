//! Prelude for acpi-backlight-levels.

pub use crate::error::{LevelTableError, LevelTableResult};
pub use crate::scale::{SCALE_MAX, ScaleMapper};
pub use crate::table::BrightnessTable;
