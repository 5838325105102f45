//! Firmware node abstraction.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::backlight_method_set;
use crate::error::{FirmwareError, FirmwareResult};
use crate::method::FirmwareMethod;

/// Value returned by a firmware method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FirmwareValue {
    /// Integer result.
    Integer(u64),
    /// Package (ordered list) result.
    Package(Vec<FirmwareValue>),
    /// String result.
    String(String),
}

impl FirmwareValue {
    /// Short name of the value's shape, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Package(_) => "package",
            Self::String(_) => "string",
        }
    }

    /// Interpret as a 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`FirmwareError::UnexpectedType`] for non-integers and integers
    /// wider than 32 bits.
    pub fn as_u32(&self, method: FirmwareMethod) -> FirmwareResult<u32> {
        u32::try_from(self).map_err(|found| FirmwareError::UnexpectedType {
            method,
            expected: "32-bit integer",
            found: found.0,
        })
    }

    /// Interpret as a package.
    ///
    /// # Errors
    ///
    /// Returns [`FirmwareError::UnexpectedType`] for non-packages.
    pub fn into_package(self, method: FirmwareMethod) -> FirmwareResult<Vec<FirmwareValue>> {
        match self {
            Self::Package(items) => Ok(items),
            other => Err(FirmwareError::UnexpectedType {
                method,
                expected: "package",
                found: other.kind(),
            }),
        }
    }
}

impl From<u32> for FirmwareValue {
    fn from(value: u32) -> Self {
        Self::Integer(u64::from(value))
    }
}

/// Conversion failure naming the shape that was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAnInteger(pub &'static str);

impl TryFrom<&FirmwareValue> for u32 {
    type Error = NotAnInteger;

    fn try_from(value: &FirmwareValue) -> Result<Self, Self::Error> {
        match value {
            FirmwareValue::Integer(n) => match u32::try_from(*n) {
                Ok(n) => Ok(n),
                Err(_) => Err(NotAnInteger("wide integer")),
            },
            other => Err(NotAnInteger(other.kind())),
        }
    }
}

/// Shared handle to a node in the firmware tree.
pub type NodeHandle = Arc<dyn FirmwareNode>;

/// A node of the firmware namespace.
///
/// Implementations must be cheap to query; `has_method` is called repeatedly
/// during discovery.
pub trait FirmwareNode: Send + Sync + fmt::Debug {
    /// Short node name, e.g. `GFX0`.
    fn name(&self) -> &str;

    /// Whether the node implements `method`.
    fn has_method(&self, method: FirmwareMethod) -> bool;

    /// Evaluate `method` with integer arguments.
    ///
    /// # Errors
    ///
    /// Returns [`FirmwareError::MethodMissing`] if the method does not exist and
    /// [`FirmwareError::CallFailed`] if evaluation fails.
    fn evaluate(&self, method: FirmwareMethod, args: &[u32]) -> FirmwareResult<FirmwareValue>;

    /// Direct children in namespace order.
    fn children(&self) -> Vec<NodeHandle>;

    /// Whether the node exposes a complete backlight method set.
    fn supports_backlight_control(&self) -> bool {
        backlight_method_set(self).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversion() {
        assert_eq!(u32::try_from(&FirmwareValue::Integer(42)), Ok(42));
        assert_eq!(
            u32::try_from(&FirmwareValue::Integer(u64::from(u32::MAX) + 1)),
            Err(NotAnInteger("wide integer"))
        );
        assert_eq!(
            u32::try_from(&FirmwareValue::String("x".into())),
            Err(NotAnInteger("string"))
        );
    }

    #[test]
    fn test_package_shape() {
        let value = FirmwareValue::Integer(3);
        assert!(matches!(
            value.into_package(FirmwareMethod::QueryLevels),
            Err(FirmwareError::UnexpectedType { found: "integer", .. })
        ));
    }

    #[test]
    fn test_untagged_serde() -> Result<(), serde_json::Error> {
        let value: FirmwareValue = serde_json::from_str(r#"[1, 2, "x", [3]]"#)?;
        assert_eq!(
            value,
            FirmwareValue::Package(vec![
                FirmwareValue::Integer(1),
                FirmwareValue::Integer(2),
                FirmwareValue::String("x".into()),
                FirmwareValue::Package(vec![FirmwareValue::Integer(3)]),
            ])
        );
        Ok(())
    }
}
