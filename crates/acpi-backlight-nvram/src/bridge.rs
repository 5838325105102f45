//! Persistence of the committed brightness level.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{NvramError, NvramResult};
use crate::locator::StoreLocator;
use crate::store::BootVariableStore;

/// Boot variable holding the last committed level.
pub const BACKLIGHT_LEVEL_KEY: &str = "acpi-backlight-level";

/// How long `load` waits for the store to appear.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 15_000;

/// Delay between store lookups while waiting.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Longest stored value accepted on load.
const MAX_STORED_BYTES: usize = 4;

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Variable name.
    pub key: String,
    /// Maximum wait for the store on load (milliseconds).
    pub wait_timeout_ms: u64,
    /// Delay between lookups while waiting (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            key: BACKLIGHT_LEVEL_KEY.to_string(),
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PersistenceConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or the poll interval is zero.
    pub fn validate(&self) -> NvramResult<()> {
        if self.key.is_empty() {
            return Err(NvramError::invalid_configuration("key must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(NvramError::invalid_configuration(
                "poll_interval_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Wait timeout as a [`Duration`].
    #[must_use]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Reads and writes the persisted level. All failures are logged, never
/// returned.
#[derive(Debug)]
pub struct PersistenceBridge {
    locator: Arc<dyn StoreLocator>,
    config: PersistenceConfig,
    store: Mutex<Option<Arc<dyn BootVariableStore>>>,
}

impl PersistenceBridge {
    /// Create a bridge. The store is looked up lazily.
    #[must_use]
    pub fn new(locator: Arc<dyn StoreLocator>, config: PersistenceConfig) -> Self {
        Self {
            locator,
            config,
            store: Mutex::new(None),
        }
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Load the persisted level.
    ///
    /// Waits up to the configured timeout for the store. Returns `None` when
    /// the store never appears, the variable is absent, or its value does not
    /// decode to 16 bits.
    pub fn load(&self) -> Option<u16> {
        let Some(store) = self.wait_for_store() else {
            tracing::warn!(
                timeout_ms = self.config.wait_timeout_ms,
                "Boot variable store unavailable, no persisted level"
            );
            return None;
        };

        let bytes = match store.read(&self.config.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key = %self.config.key, "No persisted level");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %self.config.key, error = %e, "Failed to read persisted level");
                return None;
            }
        };

        match decode_level(&self.config.key, &bytes) {
            Ok(level) => {
                tracing::debug!(key = %self.config.key, level, "Loaded persisted level");
                Some(level)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring persisted level");
                None
            }
        }
    }

    /// Persist `level`, truncated to 16 bits, as two little-endian bytes.
    ///
    /// Does not wait for the store.
    pub fn save(&self, level: u32) {
        let Some(store) = self.current_store() else {
            tracing::warn!(level, "Boot variable store unavailable, level not saved");
            return;
        };
        let bytes = truncate_level(level).to_le_bytes();
        match store.write(&self.config.key, &bytes) {
            Ok(()) => tracing::debug!(key = %self.config.key, level, "Saved level"),
            Err(e) => tracing::warn!(key = %self.config.key, level, error = %e, "Failed to save level"),
        }
    }

    fn current_store(&self) -> Option<Arc<dyn BootVariableStore>> {
        let mut cached = self.store.lock();
        if let Some(store) = cached.as_ref() {
            return Some(store.clone());
        }
        let store = self.locator.locate()?;
        *cached = Some(store.clone());
        Some(store)
    }

    fn wait_for_store(&self) -> Option<Arc<dyn BootVariableStore>> {
        let poll = self.config.poll_interval();
        let deadline = Instant::now().checked_add(self.config.wait_timeout());
        loop {
            if let Some(store) = self.current_store() {
                return Some(store);
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => poll,
            };
            if remaining.is_zero() {
                return None;
            }
            thread::sleep(remaining.min(poll));
        }
    }
}

fn truncate_level(level: u32) -> u16 {
    u16::try_from(level & u32::from(u16::MAX)).unwrap_or(u16::MAX)
}

/// Decode up to four little-endian bytes into a 16-bit level.
fn decode_level(key: &str, bytes: &[u8]) -> NvramResult<u16> {
    if bytes.len() > MAX_STORED_BYTES {
        return Err(NvramError::Oversized {
            key: key.to_string(),
            len: bytes.len(),
            max: MAX_STORED_BYTES,
        });
    }
    let mut word = [0u8; MAX_STORED_BYTES];
    for (slot, byte) in word.iter_mut().zip(bytes) {
        *slot = *byte;
    }
    let value = u32::from_le_bytes(word);
    match u16::try_from(value) {
        Ok(level) => Ok(level),
        Err(_) => Err(NvramError::OutOfRange {
            key: key.to_string(),
            value,
        }),
    }
}
