//! Backlight capability probing.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::method::FirmwareMethod;
use crate::node::FirmwareNode;

bitflags! {
    /// Driver option bits reported by `XOPT` on extended devices.
    ///
    /// Unknown bits are kept so they show up in logs.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceOptions: u32 {
        /// Apply levels directly, never fade.
        const DISABLE_SMOOTH = 0b0000_0001;

        const _ = !0;
    }
}

/// Which pair of apply/query methods a node exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodSet {
    /// `_BCM` and `_BQC`.
    Standard,
    /// `XBCM` and `XBQC`.
    Extended,
}

impl MethodSet {
    /// Method used to apply a raw level.
    #[must_use]
    pub const fn apply(self) -> FirmwareMethod {
        match self {
            Self::Standard => FirmwareMethod::ApplyLevel,
            Self::Extended => FirmwareMethod::ApplyLevelExtended,
        }
    }

    /// Method used to query the current raw level.
    #[must_use]
    pub const fn query_current(self) -> FirmwareMethod {
        match self {
            Self::Standard => FirmwareMethod::QueryCurrent,
            Self::Extended => FirmwareMethod::QueryCurrentExtended,
        }
    }
}

/// Method set of `node`, or `None` when it cannot drive a backlight.
///
/// `_BCL` is always required. `XBCM` plus `XBQC` selects the extended set and
/// takes precedence over `_BCM` plus `_BQC`.
pub fn backlight_method_set<N: FirmwareNode + ?Sized>(node: &N) -> Option<MethodSet> {
    if !node.has_method(FirmwareMethod::QueryLevels) {
        return None;
    }
    if node.has_method(FirmwareMethod::ApplyLevelExtended)
        && node.has_method(FirmwareMethod::QueryCurrentExtended)
    {
        return Some(MethodSet::Extended);
    }
    if node.has_method(FirmwareMethod::ApplyLevel) && node.has_method(FirmwareMethod::QueryCurrent)
    {
        return Some(MethodSet::Standard);
    }
    None
}

/// What a discovered backlight node can do. Fixed after discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapability {
    /// Extended (`XBCM`/`XBQC`) method set.
    pub extended: bool,
    /// Node implements `SAVE`.
    pub has_save_method: bool,
    /// Option bits from `XOPT`; empty on standard devices.
    #[serde(with = "options_bits")]
    pub options: DeviceOptions,
}

impl DeviceCapability {
    /// Probe `node`. Returns `None` when it has no usable method set.
    ///
    /// Options are only read on extended devices; a failing `XOPT` leaves them
    /// empty.
    pub fn probe<N: FirmwareNode + ?Sized>(node: &N) -> Option<Self> {
        let set = backlight_method_set(node)?;
        let extended = set == MethodSet::Extended;

        let options = if extended && node.has_method(FirmwareMethod::QueryOptions) {
            match node
                .evaluate(FirmwareMethod::QueryOptions, &[])
                .and_then(|v| v.as_u32(FirmwareMethod::QueryOptions))
            {
                Ok(bits) => DeviceOptions::from_bits_retain(bits),
                Err(e) => {
                    tracing::warn!(node = node.name(), error = %e, "Failed to read device options");
                    DeviceOptions::empty()
                }
            }
        } else {
            DeviceOptions::empty()
        };

        let capability = Self {
            extended,
            has_save_method: node.has_method(FirmwareMethod::SaveLevel),
            options,
        };
        tracing::debug!(node = node.name(), ?capability, "Probed backlight capability");
        Some(capability)
    }

    /// Method set in use.
    #[must_use]
    pub fn method_set(&self) -> MethodSet {
        if self.extended {
            MethodSet::Extended
        } else {
            MethodSet::Standard
        }
    }

    /// Whether level changes may fade. Only extended devices fade.
    #[must_use]
    pub fn smoothing_allowed(&self) -> bool {
        self.extended && !self.options.contains(DeviceOptions::DISABLE_SMOOTH)
    }
}

mod options_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DeviceOptions;

    pub fn serialize<S: Serializer>(options: &DeviceOptions, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(options.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DeviceOptions, D::Error> {
        u32::deserialize(d).map(DeviceOptions::from_bits_retain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_node::VirtualNode;

    #[test]
    fn test_standard_method_set() {
        let node = VirtualNode::builder("LCD").backlight([0u32, 0, 10, 20]).build();
        assert_eq!(backlight_method_set(node.as_ref()), Some(MethodSet::Standard));
        let cap = DeviceCapability::probe(node.as_ref());
        assert_eq!(
            cap,
            Some(DeviceCapability {
                extended: false,
                has_save_method: false,
                options: DeviceOptions::empty(),
            })
        );
        assert!(!cap.is_some_and(|c| c.smoothing_allowed()));
    }

    #[test]
    fn test_extended_reads_options() {
        let node = VirtualNode::builder("PNLF")
            .backlight([0u32, 0, 10, 20])
            .extended()
            .options(0b11)
            .save()
            .build();
        let cap = DeviceCapability::probe(node.as_ref());
        assert!(cap.is_some_and(|c| c.extended && c.has_save_method));
        assert!(cap.is_some_and(|c| c.options.contains(DeviceOptions::DISABLE_SMOOTH)));
        assert_eq!(cap.map(|c| c.options.bits()), Some(0b11));
        assert!(!cap.is_some_and(|c| c.smoothing_allowed()));
    }

    #[test]
    fn test_extended_without_options_fades() {
        let node = VirtualNode::builder("PNLF")
            .backlight([0u32, 0, 10, 20])
            .extended()
            .build();
        let cap = DeviceCapability::probe(node.as_ref());
        assert!(cap.is_some_and(|c| c.smoothing_allowed()));
        assert_eq!(cap.map(|c| c.method_set().apply()), Some(FirmwareMethod::ApplyLevelExtended));
    }

    #[test]
    fn test_missing_methods() {
        let node = VirtualNode::builder("GFX0").control().build();
        assert!(!node.supports_backlight_control());
        assert_eq!(DeviceCapability::probe(node.as_ref()), None);

        let partial = VirtualNode::builder("LCD")
            .backlight([0u32, 0, 10, 20])
            .without_method(FirmwareMethod::QueryCurrent)
            .build();
        assert_eq!(backlight_method_set(partial.as_ref()), None);
    }

    #[test]
    fn test_options_serialize_as_bits() -> Result<(), serde_json::Error> {
        let cap = DeviceCapability {
            extended: true,
            has_save_method: false,
            options: DeviceOptions::DISABLE_SMOOTH,
        };
        let json = serde_json::to_value(cap)?;
        assert_eq!(json["options"], 1);
        let back: DeviceCapability = serde_json::from_value(json)?;
        assert_eq!(back, cap);
        Ok(())
    }
}
