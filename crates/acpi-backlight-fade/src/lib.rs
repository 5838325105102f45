//! # acpi-backlight-fade
//!
//! Adaptive fade state machine for ACPI backlight panels.
//!
//! Instead of jumping straight to a new level, the [`FadeController`] moves the
//! applied level toward the requested target in timed steps. Each step size and
//! delay comes from a [`StepProfileTable`] row chosen by the remaining distance,
//! so long fades start coarse and finish fine.
//!
//! The controller is pure state: it returns what to apply and when to tick
//! again, and the owner drives the timer.
//!
//! ## Example
//!
//! ```rust
//! use acpi_backlight_fade::prelude::*;
//!
//! let mut fade = FadeController::new(0, StepProfileTable::default(), true);
//! let action = fade.request_level(40);
//! assert!(matches!(action, FadeAction::Step(FadeStep { level: 4, .. })));
//!
//! let mut ticks = 0;
//! while fade.tick().is_some() {
//!     ticks += 1;
//! }
//! assert!(ticks > 0);
//! assert_eq!(fade.state().current, 40);
//! assert_eq!(fade.phase(), FadePhase::Idle);
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

pub mod controller;
pub mod error;
pub mod profile;

pub mod prelude;

pub use controller::{FadeAction, FadeController, FadePhase, FadeState, FadeStep};
pub use error::{FadeError, FadeResult};
pub use profile::{DEFAULT_PROFILES, StepProfile, StepProfileTable, UNBOUNDED_DELTA};
