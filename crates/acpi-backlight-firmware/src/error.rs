//! Error types for firmware method evaluation and discovery.

use thiserror::Error;

use crate::method::FirmwareMethod;

/// Errors produced by firmware nodes and discovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirmwareError {
    /// The node does not implement the method.
    #[error("{node} has no {method} method")]
    MethodMissing {
        /// Node name.
        node: String,
        /// Requested method.
        method: FirmwareMethod,
    },

    /// The method exists but its evaluation failed.
    #[error("{method} on {node} failed: {reason}")]
    CallFailed {
        /// Node name.
        node: String,
        /// Evaluated method.
        method: FirmwareMethod,
        /// Failure description.
        reason: String,
    },

    /// The method returned a value of the wrong shape.
    #[error("{method} returned {found}, expected {expected}")]
    UnexpectedType {
        /// Evaluated method.
        method: FirmwareMethod,
        /// Expected shape.
        expected: &'static str,
        /// Shape actually returned.
        found: &'static str,
    },

    /// No node in the tree exposes a usable backlight method set.
    #[error("Backlight discovery failed: {0}")]
    DiscoveryFailed(String),
}

impl FirmwareError {
    /// Create a method-missing error.
    #[must_use]
    pub fn method_missing(node: impl Into<String>, method: FirmwareMethod) -> Self {
        Self::MethodMissing {
            node: node.into(),
            method,
        }
    }

    /// Create a call-failed error.
    #[must_use]
    pub fn call_failed(
        node: impl Into<String>,
        method: FirmwareMethod,
        reason: impl Into<String>,
    ) -> Self {
        Self::CallFailed {
            node: node.into(),
            method,
            reason: reason.into(),
        }
    }

    /// Create a discovery error.
    #[must_use]
    pub fn discovery_failed(reason: impl Into<String>) -> Self {
        Self::DiscoveryFailed(reason.into())
    }
}

/// A specialized `Result` type for firmware operations.
pub type FirmwareResult<T> = std::result::Result<T, FirmwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FirmwareError::method_missing("GFX0", FirmwareMethod::QueryLevels);
        assert_eq!(err.to_string(), "GFX0 has no _BCL method");

        let err = FirmwareError::call_failed("DD02", FirmwareMethod::ApplyLevel, "timeout");
        assert_eq!(err.to_string(), "_BCM on DD02 failed: timeout");
    }
}
