//! Error types for backlightctl

use acpi_backlight_driver::DriverError;
use acpi_backlight_firmware::FirmwareError;
use acpi_backlight_levels::LevelTableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Backlight not found: {0}")]
    BacklightNotFound(String),

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Firmware error: {0}")]
    Firmware(#[from] FirmwareError),

    #[error("Level table error: {0}")]
    LevelTable(#[from] LevelTableError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BacklightNotFound(_)
            | Self::Driver(DriverError::Discovery(_))
            | Self::Firmware(FirmwareError::DiscoveryFailed(_)) => 2,
            Self::InvalidFixture(_) | Self::JsonError(_) => 3,
            Self::ValidationError(_)
            | Self::LevelTable(_)
            | Self::Driver(
                DriverError::InvalidConfiguration(_)
                | DriverError::InvalidProperty { .. }
                | DriverError::Profiles(_),
            ) => 4,
            Self::Driver(
                DriverError::WorkerStopped | DriverError::Timeout(_) | DriverError::WorkerPanicked,
            ) => 5,
            _ => 1,
        }
    }
}

/// Exit code for an error returned from a command.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    error.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_failures_map_to_not_found() {
        let err = CliError::Driver(DriverError::Discovery(FirmwareError::discovery_failed(
            "no panel",
        )));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(CliError::BacklightNotFound("x".into()).exit_code(), 2);
    }

    #[test]
    fn test_validation_failures_map_to_four() {
        assert_eq!(CliError::ValidationError("bad".into()).exit_code(), 4);
        let err = CliError::Driver(DriverError::invalid_configuration("zero timeout"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_unknown_errors_map_to_one() {
        let err = anyhow::anyhow!("plain failure");
        assert_eq!(exit_code(&err), 1);
        let err = CliError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.exit_code(), 1);
        let err = anyhow::Error::new(CliError::InvalidFixture("empty".into()));
        assert_eq!(exit_code(&err), 3);
    }
}
