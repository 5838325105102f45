//! Shared test utilities for the ACPI backlight crates.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with `#[track_caller]`
//! - [`recording`] - A firmware node wrapper that timestamps every call
//! - [`fixtures`] - Level packages and ready-made firmware trees
//! - [`prelude`] - Convenience re-exports
//!
//! ```rust,ignore
//! use acpi_backlight_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod must;
pub mod prelude;
pub mod recording;

#[cfg(feature = "fixtures")]
#[cfg_attr(docsrs, doc(cfg(feature = "fixtures")))]
pub mod fixtures;

pub use must::*;
