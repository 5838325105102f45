//! Panel driver configuration.

use std::path::Path;
use std::time::Duration;

use acpi_backlight_fade::StepProfileTable;
use acpi_backlight_nvram::PersistenceConfig;
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};

/// Default name of the per-panel worker thread.
pub const DEFAULT_WORKER_NAME: &str = "acpi-backlight";

/// Default wait for a worker reply, in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2_000;

/// Configuration for one attached panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Fade step profiles.
    pub profiles: StepProfileTable,

    /// Allow fades at all. Devices that cannot fade ignore this.
    ///
    /// Default: true.
    pub smoothing_enabled: bool,

    /// The query-current method returns a position in `_BCL` rather than a
    /// raw level.
    ///
    /// Default: false.
    pub bqc_use_index: bool,

    /// How long a caller waits for the worker to answer, in milliseconds.
    pub command_timeout_ms: u64,

    /// Worker thread name.
    pub worker_name: String,

    /// Boot-variable persistence.
    pub persistence: PersistenceConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            profiles: StepProfileTable::default(),
            smoothing_enabled: true,
            bqc_use_index: false,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl PanelConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result is invalid.
    pub fn from_json_str(json: &str) -> DriverResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DriverError::invalid_configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> DriverResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DriverError::invalid_configuration(format!("{}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> DriverResult<()> {
        if self.command_timeout_ms == 0 {
            return Err(DriverError::invalid_configuration(
                "command_timeout_ms must be greater than 0",
            ));
        }
        if self.worker_name.trim().is_empty() {
            return Err(DriverError::invalid_configuration(
                "worker_name must not be empty",
            ));
        }
        self.persistence
            .validate()
            .map_err(|e| DriverError::invalid_configuration(e.to_string()))
    }

    /// Reply timeout as a [`Duration`].
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Builder for [`PanelConfig`].
#[derive(Debug, Default)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    /// Set the step profiles.
    #[must_use]
    pub fn profiles(mut self, profiles: StepProfileTable) -> Self {
        self.config.profiles = profiles;
        self
    }

    /// Enable or disable fades.
    #[must_use]
    pub fn smoothing_enabled(mut self, enabled: bool) -> Self {
        self.config.smoothing_enabled = enabled;
        self
    }

    /// Treat the query-current result as a `_BCL` position.
    #[must_use]
    pub fn bqc_use_index(mut self, use_index: bool) -> Self {
        self.config.bqc_use_index = use_index;
        self
    }

    /// Set the reply timeout in milliseconds.
    #[must_use]
    pub fn command_timeout_ms(mut self, ms: u64) -> Self {
        self.config.command_timeout_ms = ms;
        self
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn worker_name(mut self, name: impl Into<String>) -> Self {
        self.config.worker_name = name.into();
        self
    }

    /// Set the persistence settings.
    #[must_use]
    pub fn persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.config.persistence = persistence;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> DriverResult<PanelConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
