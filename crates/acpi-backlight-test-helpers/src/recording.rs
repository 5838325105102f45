//! Call recording around any firmware node.

use std::sync::Arc;
use std::time::{Duration, Instant};

use acpi_backlight_firmware::{FirmwareMethod, FirmwareNode, FirmwareResult, FirmwareValue, NodeHandle};
use parking_lot::Mutex;

/// One recorded firmware call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareCall {
    /// Method evaluated.
    pub method: FirmwareMethod,
    /// Arguments passed.
    pub args: Vec<u32>,
    /// When the call was made.
    pub at: Instant,
}

/// Wraps a node and records every evaluation with a timestamp.
///
/// Children are passed through unwrapped, so wrap the node the driver will
/// actually talk to and hand the wrapper to discovery as the provider.
#[derive(Debug)]
pub struct RecordingFirmware {
    inner: NodeHandle,
    calls: Mutex<Vec<FirmwareCall>>,
}

impl RecordingFirmware {
    /// Wrap `inner`.
    pub fn wrap(inner: NodeHandle) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// All calls so far.
    pub fn calls(&self) -> Vec<FirmwareCall> {
        self.calls.lock().clone()
    }

    /// Arguments of every call to `method`, in order.
    pub fn args_of(&self, method: FirmwareMethod) -> Vec<u32> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method)
            .filter_map(|call| call.args.first().copied())
            .collect()
    }

    /// Gaps between consecutive calls to `method`.
    pub fn intervals(&self, method: FirmwareMethod) -> Vec<Duration> {
        let stamps: Vec<Instant> = self
            .calls
            .lock()
            .iter()
            .filter(|call| call.method == method)
            .map(|call| call.at)
            .collect();
        stamps
            .windows(2)
            .map(|pair| match pair {
                [earlier, later] => later.saturating_duration_since(*earlier),
                _ => Duration::ZERO,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl FirmwareNode for RecordingFirmware {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn has_method(&self, method: FirmwareMethod) -> bool {
        self.inner.has_method(method)
    }

    fn evaluate(&self, method: FirmwareMethod, args: &[u32]) -> FirmwareResult<FirmwareValue> {
        self.calls.lock().push(FirmwareCall {
            method,
            args: args.to_vec(),
            at: Instant::now(),
        });
        self.inner.evaluate(method, args)
    }

    fn children(&self) -> Vec<NodeHandle> {
        self.inner.children()
    }
}
