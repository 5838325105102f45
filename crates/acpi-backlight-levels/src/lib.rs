//! # acpi-backlight-levels
//!
//! Level table normalization and scale mapping for ACPI backlight panels.
//!
//! Firmware reports its supported brightness levels as an irregular list of raw
//! values (the `_BCL` package). The OS works on a fixed normalized scale
//! `[0, SCALE_MAX]`. This crate bridges the two:
//!
//! - [`table`] - turns the raw firmware list into a [`BrightnessTable`] plus the
//!   AC-minimum and battery-maximum reference indices
//! - [`scale`] - [`ScaleMapper`], the integer arithmetic between normalized
//!   levels, table indices and raw firmware values
//! - [`error`] - table construction errors
//!
//! Both types are built once when a panel attaches and are read-only afterwards.
//!
//! ## Example
//!
//! ```rust
//! use acpi_backlight_levels::prelude::*;
//!
//! let table = BrightnessTable::normalize(&[5, 95, 10, 20, 30, 40])?;
//! assert_eq!(table.levels(), &[10, 20, 30, 40]);
//! assert_eq!(table.ac_min_index(), 0);
//! assert_eq!(table.bat_max_index(), 3);
//!
//! let mapper = ScaleMapper::new(table);
//! assert_eq!(mapper.index_for_level(SCALE_MAX), (3, 0));
//! assert_eq!(mapper.raw_for_level(SCALE_MAX, false), Some(40));
//! # Ok::<(), LevelTableError>(())
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

pub mod error;
pub mod scale;
pub mod table;

pub mod prelude;

pub use error::{LevelTableError, LevelTableResult};
pub use scale::{SCALE_MAX, ScaleMapper};
pub use table::BrightnessTable;
