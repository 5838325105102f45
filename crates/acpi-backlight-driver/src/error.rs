//! Error types for the panel driver.

use std::time::Duration;

use acpi_backlight_fade::FadeError;
use acpi_backlight_firmware::FirmwareError;
use thiserror::Error;

/// Errors surfaced by [`crate::BacklightDriver`].
///
/// Firmware call failures during normal operation are logged and never
/// returned; only attach-time discovery failures reach the caller.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No usable backlight device in the firmware tree.
    #[error("Backlight discovery failed: {0}")]
    Discovery(#[source] FirmwareError),

    /// A step profile edit was rejected.
    #[error("Rejected step profiles: {0}")]
    Profiles(#[from] FadeError),

    /// A property value has the wrong type.
    #[error("Property {key} expects {expected}")]
    InvalidProperty {
        /// Property name.
        key: String,
        /// Expected value type.
        expected: &'static str,
    },

    /// Configuration is invalid.
    #[error("Invalid driver configuration: {0}")]
    InvalidConfiguration(String),

    /// The worker thread could not be started.
    #[error("Failed to spawn panel worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread has exited.
    #[error("Panel worker is not running")]
    WorkerStopped,

    /// The worker did not answer in time.
    #[error("Panel worker did not answer within {0:?}")]
    Timeout(Duration),

    /// The worker thread panicked.
    #[error("Panel worker panicked")]
    WorkerPanicked,
}

impl DriverError {
    /// Create a configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a property type error.
    #[must_use]
    pub fn invalid_property(key: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidProperty {
            key: key.into(),
            expected,
        }
    }
}

/// A specialized `Result` type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
