//! Finding the boot-variable store.
//!
//! The store may not be available yet when a panel attaches (early boot), so
//! the bridge asks a locator repeatedly until it answers or a deadline passes.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::store::{BootVariableStore, FileStore};

/// Resolves the boot-variable store, if it is available yet.
pub trait StoreLocator: Send + Sync + fmt::Debug {
    /// Current store, or `None` while it is unavailable.
    fn locate(&self) -> Option<Arc<dyn BootVariableStore>>;
}

/// A store that is always available.
#[derive(Debug, Clone)]
pub struct StaticLocator {
    store: Arc<dyn BootVariableStore>,
}

impl StaticLocator {
    /// Wrap `store`.
    #[must_use]
    pub fn new(store: Arc<dyn BootVariableStore>) -> Self {
        Self { store }
    }
}

impl StoreLocator for StaticLocator {
    fn locate(&self) -> Option<Arc<dyn BootVariableStore>> {
        Some(self.store.clone())
    }
}

/// No store on this system.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStore;

impl StoreLocator for NoStore {
    fn locate(&self) -> Option<Arc<dyn BootVariableStore>> {
        None
    }
}

/// A store that appears after a number of failed lookups.
#[derive(Debug)]
pub struct DelayedLocator {
    store: Arc<dyn BootVariableStore>,
    misses_left: AtomicUsize,
}

impl DelayedLocator {
    /// Answer `None` for the first `misses` lookups, then `store`.
    #[must_use]
    pub fn new(store: Arc<dyn BootVariableStore>, misses: usize) -> Self {
        Self {
            store,
            misses_left: AtomicUsize::new(misses),
        }
    }
}

impl StoreLocator for DelayedLocator {
    fn locate(&self) -> Option<Arc<dyn BootVariableStore>> {
        let missed = self
            .misses_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .is_ok();
        if missed { None } else { Some(self.store.clone()) }
    }
}

/// File-backed store, available once its directory exists.
#[derive(Debug, Clone)]
pub struct FileStoreLocator {
    path: PathBuf,
}

impl FileStoreLocator {
    /// Locate a [`FileStore`] at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StoreLocator for FileStoreLocator {
    fn locate(&self) -> Option<Arc<dyn BootVariableStore>> {
        let dir_ready = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        };
        if !dir_ready {
            return None;
        }
        Some(Arc::new(FileStore::new(self.path.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_delayed_locator_counts_misses() {
        let locator = DelayedLocator::new(Arc::new(MemoryStore::new()), 2);
        assert!(locator.locate().is_none());
        assert!(locator.locate().is_none());
        assert!(locator.locate().is_some());
        assert!(locator.locate().is_some());
    }

    #[test]
    fn test_file_locator_waits_for_directory() {
        let locator = FileStoreLocator::new("/nonexistent-dir-for-backlight/nvram.json");
        assert!(locator.locate().is_none());
        assert!(FileStoreLocator::new("nvram.json").locate().is_some());
    }

    #[test]
    fn test_no_store() {
        assert!(NoStore.locate().is_none());
    }
}
