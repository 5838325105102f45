//! Convenience re-exports for common test utilities.

pub use crate::must::{must, must_parse, must_some, must_with};
pub use crate::recording::{FirmwareCall, RecordingFirmware};

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    ASCENDING_BCL, DESCENDING_BCL, EXTENDED_BCL, LAPTOP_BCL, PANEL_NODE, PanelFixture,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
