//! Prelude for acpi-backlight-fade.

pub use crate::controller::{FadeAction, FadeController, FadePhase, FadeState, FadeStep};
pub use crate::error::{FadeError, FadeResult};
pub use crate::profile::{DEFAULT_PROFILES, StepProfile, StepProfileTable, UNBOUNDED_DELTA};
