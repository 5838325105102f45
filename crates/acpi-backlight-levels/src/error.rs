//! Error types for level table construction.

use thiserror::Error;

/// Errors produced while normalizing a firmware level list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelTableError {
    /// The firmware list is too short to carry the two reference entries plus levels.
    #[error("Level list has {len} entries, at least {min} are required")]
    TooFewEntries {
        /// Number of entries reported by firmware.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// An entry of the firmware list is not an integer.
    #[error("Level list entry {index} is not an integer")]
    NonIntegral {
        /// Position of the offending entry in the raw list.
        index: usize,
    },

    /// Index bounds do not fit the table.
    #[error("Invalid index bounds {lo}..={hi} for a table of {len} levels")]
    InvalidBounds {
        /// Requested lower bound.
        lo: usize,
        /// Requested upper bound.
        hi: usize,
        /// Table length.
        len: usize,
    },
}

impl LevelTableError {
    /// Create a too-few-entries error.
    #[must_use]
    pub fn too_few_entries(len: usize, min: usize) -> Self {
        Self::TooFewEntries { len, min }
    }

    /// Create a non-integral entry error.
    #[must_use]
    pub fn non_integral(index: usize) -> Self {
        Self::NonIntegral { index }
    }
}

/// A specialized `Result` type for level table operations.
pub type LevelTableResult<T> = std::result::Result<T, LevelTableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LevelTableError::too_few_entries(2, 3);
        assert!(err.to_string().contains("2 entries"));

        let err = LevelTableError::non_integral(4);
        assert!(err.to_string().contains("entry 4"));
    }
}
