//! Typed calls against a discovered backlight device.

use std::sync::Arc;

use crate::capability::DeviceCapability;
use crate::error::FirmwareResult;
use crate::method::FirmwareMethod;
use crate::node::{FirmwareValue, NodeHandle};

/// `_DOS` argument that hands brightness control to the OS.
pub const SOFTWARE_CONTROL_MODE: u32 = 0x4;

/// A discovered control/backlight node pair and its capability.
///
/// Owns its node handles; they are released when the device is dropped.
#[derive(Debug, Clone)]
pub struct BacklightDevice {
    control: NodeHandle,
    control_path: String,
    backlight: NodeHandle,
    backlight_path: String,
    capability: DeviceCapability,
}

impl BacklightDevice {
    /// Assemble a device from discovered parts.
    #[must_use]
    pub fn new(
        control: NodeHandle,
        control_path: String,
        backlight: NodeHandle,
        backlight_path: String,
        capability: DeviceCapability,
    ) -> Self {
        Self {
            control,
            control_path,
            backlight,
            backlight_path,
            capability,
        }
    }

    /// Capability probed at discovery.
    #[must_use]
    pub fn capability(&self) -> DeviceCapability {
        self.capability
    }

    /// Dot-joined path of the control node.
    #[must_use]
    pub fn control_path(&self) -> &str {
        &self.control_path
    }

    /// Dot-joined path of the backlight node.
    #[must_use]
    pub fn backlight_path(&self) -> &str {
        &self.backlight_path
    }

    /// Whether control and backlight are the same node.
    #[must_use]
    pub fn is_single_node(&self) -> bool {
        Arc::ptr_eq(&self.control, &self.backlight)
    }

    /// `_BCL`: the raw level package, reference entries included.
    ///
    /// # Errors
    ///
    /// Fails when the call fails or does not return a package.
    pub fn query_levels(&self) -> FirmwareResult<Vec<FirmwareValue>> {
        let method = FirmwareMethod::QueryLevels;
        self.backlight.evaluate(method, &[])?.into_package(method)
    }

    /// `_BCM` or `XBCM`: apply a raw level.
    ///
    /// # Errors
    ///
    /// Fails when the call fails.
    pub fn apply_level(&self, raw: u32) -> FirmwareResult<()> {
        let method = self.capability.method_set().apply();
        self.backlight.evaluate(method, &[raw])?;
        tracing::trace!(raw, %method, "Applied raw level");
        Ok(())
    }

    /// `_BQC` or `XBQC`: current raw level.
    ///
    /// With `use_index` the firmware reports a position in the raw `_BCL`
    /// package, which is translated to the level stored there. A position that
    /// cannot be translated is returned unchanged.
    ///
    /// # Errors
    ///
    /// Fails when the query call fails or returns a non-integer.
    pub fn query_current_level(&self, use_index: bool) -> FirmwareResult<u32> {
        let method = self.capability.method_set().query_current();
        let reported = self.backlight.evaluate(method, &[])?.as_u32(method)?;
        if !use_index {
            return Ok(reported);
        }

        let translated = usize::try_from(reported).ok().and_then(|index| {
            let levels = self.query_levels().ok()?;
            levels.get(index).and_then(|value| u32::try_from(value).ok())
        });
        Ok(translated.unwrap_or(reported))
    }

    /// `_DOS(4)` on the control node: switch to software brightness control.
    ///
    /// # Errors
    ///
    /// Fails when the call fails.
    pub fn set_control_mode(&self) -> FirmwareResult<()> {
        self.control
            .evaluate(FirmwareMethod::SetControlMode, &[SOFTWARE_CONTROL_MODE])?;
        tracing::debug!(path = %self.control_path, "Firmware brightness control disabled");
        Ok(())
    }

    /// `SAVE`: store a raw level in the firmware's own persistent store.
    ///
    /// # Errors
    ///
    /// Fails when the call fails or the device has no `SAVE` method.
    pub fn save_level(&self, raw: u32) -> FirmwareResult<()> {
        self.backlight.evaluate(FirmwareMethod::SaveLevel, &[raw])?;
        Ok(())
    }

    /// `DEB1`: diagnostics passthrough.
    ///
    /// # Errors
    ///
    /// Fails when the call fails.
    pub fn debug_level(&self, value: u32) -> FirmwareResult<FirmwareValue> {
        self.backlight.evaluate(FirmwareMethod::DebugLevel, &[value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::DeviceOptions;
    use crate::error::FirmwareError;
    use crate::virtual_node::VirtualNode;

    fn device_for(node: &Arc<VirtualNode>, extended: bool) -> BacklightDevice {
        let handle: NodeHandle = node.clone();
        BacklightDevice::new(
            handle.clone(),
            "LCD".into(),
            handle,
            "LCD".into(),
            DeviceCapability {
                extended,
                has_save_method: true,
                options: DeviceOptions::empty(),
            },
        )
    }

    #[test]
    fn test_extended_device_uses_extended_methods() -> Result<(), FirmwareError> {
        let node = VirtualNode::builder("LCD")
            .backlight([0u32, 0, 10, 20])
            .extended()
            .build();
        let device = device_for(&node, true);
        device.apply_level(20)?;
        assert_eq!(device.query_current_level(false)?, 20);
        assert_eq!(
            node.calls(),
            vec![
                FirmwareMethod::ApplyLevelExtended,
                FirmwareMethod::QueryCurrentExtended
            ]
        );
        Ok(())
    }

    #[test]
    fn test_query_current_translates_index() -> Result<(), FirmwareError> {
        let node = VirtualNode::builder("LCD")
            .backlight([40u32, 10, 10, 20, 30, 40])
            .reports_index()
            .current(30)
            .build();
        let device = device_for(&node, false);
        assert_eq!(device.query_current_level(false)?, 4);
        assert_eq!(device.query_current_level(true)?, 30);
        Ok(())
    }

    #[test]
    fn test_control_mode_and_save() -> Result<(), FirmwareError> {
        let node = VirtualNode::builder("LCD")
            .backlight([0u32, 0, 10, 20])
            .control()
            .save()
            .build();
        let device = device_for(&node, false);
        device.set_control_mode()?;
        device.save_level(20)?;
        assert_eq!(node.control_mode(), Some(SOFTWARE_CONTROL_MODE));
        assert_eq!(node.saved_level(), Some(20));
        assert!(device.is_single_node());
        Ok(())
    }

    #[test]
    fn test_query_levels_without_bcl() {
        let node = VirtualNode::builder("LCD").debug().build();
        let device = device_for(&node, false);
        assert!(matches!(
            device.query_levels(),
            Err(FirmwareError::MethodMissing { .. })
        ));
        assert!(matches!(device.debug_level(7), Ok(FirmwareValue::Integer(7))));
        assert_eq!(node.debug_values(), vec![7]);
    }
}
