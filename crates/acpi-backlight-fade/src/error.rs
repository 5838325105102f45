//! Error types for step profile configuration.

use thiserror::Error;

/// Errors produced while validating a step profile table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FadeError {
    /// The table has no entries.
    #[error("Step profile table is empty")]
    EmptyProfileTable,

    /// A profile would never move the level.
    #[error("Step profile {index} has a zero step")]
    ZeroStep {
        /// Position of the offending profile.
        index: usize,
    },

    /// Thresholds are not in ascending order.
    #[error("Step profile {index} threshold is below the previous profile's")]
    UnorderedThresholds {
        /// Position of the first out-of-order profile.
        index: usize,
    },

    /// A profile index is outside the table.
    #[error("Step profile index {index} out of range (table has {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Table length.
        len: usize,
    },
}

impl FadeError {
    /// Create a zero-step error.
    #[must_use]
    pub fn zero_step(index: usize) -> Self {
        Self::ZeroStep { index }
    }

    /// Create an unordered-thresholds error.
    #[must_use]
    pub fn unordered_thresholds(index: usize) -> Self {
        Self::UnorderedThresholds { index }
    }
}

/// A specialized `Result` type for fade configuration.
pub type FadeResult<T> = std::result::Result<T, FadeError>;
