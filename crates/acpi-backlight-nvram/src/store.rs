//! Boot-variable stores.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{NvramError, NvramResult};

/// A key/value store that survives reboots.
pub trait BootVariableStore: Send + Sync + fmt::Debug {
    /// Read a variable. `Ok(None)` when it is not set.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    fn read(&self, key: &str) -> NvramResult<Option<Vec<u8>>>;

    /// Write a variable.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be written.
    fn write(&self, key: &str, value: &[u8]) -> NvramResult<()>;
}

/// In-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    vars: BTreeMap<String, Vec<u8>>,
    writable: bool,
}

impl MemoryStore {
    /// Create an empty, writable store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                vars: BTreeMap::new(),
                writable: true,
            }),
        }
    }

    /// Create a store holding one variable.
    #[must_use]
    pub fn with_variable(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store.inner.lock().vars.insert(key.into(), value.into());
        store
    }

    /// Allow or reject writes.
    pub fn set_writable(&self, writable: bool) {
        self.inner.lock().writable = writable;
    }

    /// Raw bytes of a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().vars.get(key).cloned()
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().vars.len()
    }

    /// Whether no variable is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().vars.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BootVariableStore for MemoryStore {
    fn read(&self, key: &str) -> NvramResult<Option<Vec<u8>>> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &[u8]) -> NvramResult<()> {
        let mut inner = self.inner.lock();
        if !inner.writable {
            return Err(NvramError::ReadOnly {
                key: key.to_string(),
            });
        }
        inner.vars.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Store backed by a JSON file mapping variable names to byte arrays.
///
/// A missing file is an empty store. Writes go to a temporary file that is
/// renamed over the original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All variables currently stored.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load_all(&self) -> NvramResult<BTreeMap<String, Vec<u8>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(NvramError::io(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|source| NvramError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_atomic(&self, vars: &BTreeMap<String, Vec<u8>>) -> NvramResult<()> {
        let content = serde_json::to_string_pretty(vars).map_err(|source| NvramError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|e| NvramError::io(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| NvramError::io(&self.path, e))?;
        Ok(())
    }
}

impl BootVariableStore for FileStore {
    fn read(&self, key: &str) -> NvramResult<Option<Vec<u8>>> {
        Ok(self.load_all()?.remove(key))
    }

    fn write(&self, key: &str, value: &[u8]) -> NvramResult<()> {
        let _guard = self.write_lock.lock();
        let mut vars = self.load_all()?;
        vars.insert(key.to_string(), value.to_vec());
        self.write_atomic(&vars)?;
        tracing::debug!(path = %self.path.display(), key, len = value.len(), "Wrote boot variable");
        Ok(())
    }
}
