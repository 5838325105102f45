//! Firmware diagnostics behind the `diagnostics` feature.
//!
//! Both run on the panel worker and block it while they execute.

use std::thread;
use std::time::Duration;

use acpi_backlight_firmware::BacklightDevice;

/// Pacing of a raw sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePacing {
    /// Delay after each raw write.
    pub step: Duration,
    /// Delay between the upward and downward sweeps.
    pub pause: Duration,
}

impl Default for CyclePacing {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(16),
            pause: Duration::from_millis(500),
        }
    }
}

/// Write raw levels `1..=max_raw`, pause, then `max_raw..=1`, bypassing the
/// level table. Returns the number of successful writes.
pub fn cycle_test(device: &BacklightDevice, max_raw: u32, pacing: CyclePacing) -> usize {
    tracing::info!(path = %device.backlight_path(), max_raw, "CycleTest up");
    let mut written = sweep(device, 1..=max_raw, pacing.step);
    thread::sleep(pacing.pause);
    tracing::info!(path = %device.backlight_path(), max_raw, "CycleTest down");
    written = written.saturating_add(sweep(device, (1..=max_raw).rev(), pacing.step));
    written
}

fn sweep(device: &BacklightDevice, levels: impl Iterator<Item = u32>, step: Duration) -> usize {
    let mut written = 0usize;
    for raw in levels {
        match device.apply_level(raw) {
            Ok(()) => written = written.saturating_add(1),
            Err(e) => tracing::warn!(raw, error = %e, "CycleTest write failed"),
        }
        thread::sleep(step);
    }
    written
}

/// Pass `value` to the firmware debug method. Returns whether the call
/// succeeded.
pub fn klvx(device: &BacklightDevice, value: u32) -> bool {
    match device.debug_level(value) {
        Ok(reply) => {
            tracing::debug!(value, ?reply, "KLVX sent");
            true
        }
        Err(e) => {
            tracing::warn!(value, error = %e, "KLVX failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acpi_backlight_firmware::{DeviceCapability, DeviceOptions, NodeHandle, VirtualNode};

    fn device_for(node: NodeHandle) -> BacklightDevice {
        BacklightDevice::new(
            node.clone(),
            "LCD".into(),
            node,
            "LCD".into(),
            DeviceCapability {
                extended: false,
                has_save_method: false,
                options: DeviceOptions::empty(),
            },
        )
    }

    #[test]
    fn test_cycle_sweeps_up_then_down() {
        let node = VirtualNode::builder("LCD")
            .backlight([0u32, 0, 1, 2, 3])
            .build();
        let device = device_for(node.clone());
        let pacing = CyclePacing {
            step: Duration::ZERO,
            pause: Duration::ZERO,
        };
        assert_eq!(cycle_test(&device, 3, pacing), 6);
        assert_eq!(node.writes(), vec![1, 2, 3, 3, 2, 1]);
    }

    #[test]
    fn test_klvx_needs_debug_method() {
        let plain = VirtualNode::builder("LCD").build();
        assert!(!klvx(&device_for(plain), 1));

        let debug = VirtualNode::builder("LCD").debug().build();
        assert!(klvx(&device_for(debug.clone()), 9));
        assert_eq!(debug.debug_values(), vec![9]);
    }
}
