//! Prelude for acpi-backlight-nvram.

pub use crate::bridge::{BACKLIGHT_LEVEL_KEY, PersistenceBridge, PersistenceConfig};
pub use crate::error::{NvramError, NvramResult};
pub use crate::locator::{FileStoreLocator, NoStore, StaticLocator, StoreLocator};
pub use crate::store::{BootVariableStore, FileStore, MemoryStore};
