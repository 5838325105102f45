//! Display-parameter protocol.
//!
//! The OS side sees brightness as an integer parameter in `[0, SCALE_MAX]`
//! plus a `commit` parameter it writes when a level should be kept.

use std::fmt;
use std::str::FromStr;

use acpi_backlight_levels::SCALE_MAX;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer parameters accepted by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayParameter {
    /// Requested brightness level.
    Brightness,
    /// Keep the current target as the committed level.
    Commit,
}

impl DisplayParameter {
    /// Protocol name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for DisplayParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that is not a display parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown display parameter: {0}")]
pub struct UnknownParameter(pub String);

impl FromStr for DisplayParameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brightness" => Ok(Self::Brightness),
            "commit" => Ok(Self::Commit),
            other => Err(UnknownParameter(other.to_string())),
        }
    }
}

/// Integer parameter bounds and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRange {
    /// Minimum.
    pub min: u32,
    /// Maximum.
    pub max: u32,
    /// Current value.
    pub value: u32,
}

/// The commit entry's register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitParameter {
    /// Always 0.
    pub reg: u32,
}

/// Parameters published to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// `brightness` range and committed value.
    pub brightness: ParameterRange,
    /// `commit` entry.
    pub commit: CommitParameter,
}

impl ParameterSet {
    /// Parameters for a committed level.
    #[must_use]
    pub fn for_committed(committed: u32) -> Self {
        Self {
            brightness: ParameterRange {
                min: 0,
                max: SCALE_MAX,
                value: committed,
            },
            commit: CommitParameter::default(),
        }
    }
}
