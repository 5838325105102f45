//! # acpi-backlight-nvram
//!
//! Persistence of the last committed backlight level in a boot-variable store.
//!
//! - [`store`] - the [`BootVariableStore`] trait with in-memory and JSON file
//!   implementations
//! - [`locator`] - [`StoreLocator`], for stores that appear late in boot
//! - [`bridge`] - [`PersistenceBridge`], the best-effort `load`/`save` pair the
//!   driver uses
//!
//! The level lives under [`BACKLIGHT_LEVEL_KEY`] as little-endian bytes.

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bridge;
pub mod error;
pub mod locator;
pub mod store;

pub mod prelude;

pub use bridge::{BACKLIGHT_LEVEL_KEY, PersistenceBridge, PersistenceConfig};
pub use error::{NvramError, NvramResult};
pub use locator::{DelayedLocator, FileStoreLocator, NoStore, StaticLocator, StoreLocator};
pub use store::{BootVariableStore, FileStore, MemoryStore};
