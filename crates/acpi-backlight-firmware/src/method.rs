//! Firmware methods used by the backlight driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A firmware method the driver evaluates, named by what it does.
///
/// Serialized by its ACPI object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FirmwareMethod {
    /// `_BCL`: package of supported raw levels.
    #[serde(rename = "_BCL")]
    QueryLevels,
    /// `_BCM`: set the raw level.
    #[serde(rename = "_BCM")]
    ApplyLevel,
    /// `XBCM`: set the raw level on extended devices.
    #[serde(rename = "XBCM")]
    ApplyLevelExtended,
    /// `_BQC`: current raw level.
    #[serde(rename = "_BQC")]
    QueryCurrent,
    /// `XBQC`: current raw level on extended devices.
    #[serde(rename = "XBQC")]
    QueryCurrentExtended,
    /// `_DOS`: output switching and brightness control mode.
    #[serde(rename = "_DOS")]
    SetControlMode,
    /// `SAVE`: persist a raw level in the firmware store.
    #[serde(rename = "SAVE")]
    SaveLevel,
    /// `XOPT`: driver option bits.
    #[serde(rename = "XOPT")]
    QueryOptions,
    /// `DEB1`: diagnostics hook.
    #[serde(rename = "DEB1")]
    DebugLevel,
}

impl FirmwareMethod {
    /// Every known method.
    pub const ALL: [FirmwareMethod; 9] = [
        Self::QueryLevels,
        Self::ApplyLevel,
        Self::ApplyLevelExtended,
        Self::QueryCurrent,
        Self::QueryCurrentExtended,
        Self::SetControlMode,
        Self::SaveLevel,
        Self::QueryOptions,
        Self::DebugLevel,
    ];

    /// ACPI object name.
    #[must_use]
    pub const fn acpi_name(self) -> &'static str {
        match self {
            Self::QueryLevels => "_BCL",
            Self::ApplyLevel => "_BCM",
            Self::ApplyLevelExtended => "XBCM",
            Self::QueryCurrent => "_BQC",
            Self::QueryCurrentExtended => "XBQC",
            Self::SetControlMode => "_DOS",
            Self::SaveLevel => "SAVE",
            Self::QueryOptions => "XOPT",
            Self::DebugLevel => "DEB1",
        }
    }

    /// Look up a method by ACPI object name.
    #[must_use]
    pub fn from_acpi_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.acpi_name() == name)
    }
}

impl fmt::Display for FirmwareMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.acpi_name())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown firmware method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for FirmwareMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_acpi_name(s).ok_or_else(|| UnknownMethod(s.to_string()))
    }
}
