//! In-memory firmware node.
//!
//! Used for tests and by the CLI to simulate a panel. Every method call is
//! recorded, and individual methods can be made to fail.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{FirmwareError, FirmwareResult};
use crate::method::FirmwareMethod;
use crate::node::{FirmwareNode, FirmwareValue, NodeHandle};

/// Index of the first level after the two reference entries of `_BCL`.
const FIRST_LEVEL_ENTRY: usize = 2;

#[derive(Debug, Default)]
struct VirtualState {
    current_raw: u32,
    saved: Option<u32>,
    control_mode: Option<u32>,
    writes: Vec<u32>,
    debug_values: Vec<u32>,
    calls: Vec<FirmwareMethod>,
    failing: BTreeSet<FirmwareMethod>,
}

/// Simulated firmware node.
#[derive(Debug)]
pub struct VirtualNode {
    name: String,
    methods: BTreeSet<FirmwareMethod>,
    levels: Vec<FirmwareValue>,
    options: u32,
    reports_index: bool,
    children: Vec<NodeHandle>,
    state: Mutex<VirtualState>,
}

impl VirtualNode {
    /// Start building a node called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> VirtualNodeBuilder {
        VirtualNodeBuilder {
            name: name.into(),
            methods: BTreeSet::new(),
            levels: Vec::new(),
            options: 0,
            reports_index: false,
            current_raw: None,
            children: Vec::new(),
        }
    }

    /// Last raw level written or configured.
    #[must_use]
    pub fn current_raw(&self) -> u32 {
        self.state.lock().current_raw
    }

    /// Change the raw level behind the driver's back, as a hotkey would.
    pub fn set_current_raw(&self, raw: u32) {
        self.state.lock().current_raw = raw;
    }

    /// Level passed to the last `SAVE`.
    #[must_use]
    pub fn saved_level(&self) -> Option<u32> {
        self.state.lock().saved
    }

    /// Argument of the last `_DOS`.
    #[must_use]
    pub fn control_mode(&self) -> Option<u32> {
        self.state.lock().control_mode
    }

    /// Every raw level applied, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<u32> {
        self.state.lock().writes.clone()
    }

    /// Number of apply calls so far.
    #[must_use]
    pub fn apply_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Values passed to `DEB1`.
    #[must_use]
    pub fn debug_values(&self) -> Vec<u32> {
        self.state.lock().debug_values.clone()
    }

    /// Every evaluated method, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<FirmwareMethod> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded writes and calls.
    pub fn clear_history(&self) {
        let mut state = self.state.lock();
        state.writes.clear();
        state.calls.clear();
        state.debug_values.clear();
    }

    /// Make `method` fail until [`Self::restore`] is called.
    pub fn fail_method(&self, method: FirmwareMethod) {
        self.state.lock().failing.insert(method);
    }

    /// Undo [`Self::fail_method`].
    pub fn restore(&self, method: FirmwareMethod) {
        self.state.lock().failing.remove(&method);
    }

    fn argument(&self, method: FirmwareMethod, args: &[u32]) -> FirmwareResult<u32> {
        args.first()
            .copied()
            .ok_or_else(|| FirmwareError::call_failed(&self.name, method, "missing argument"))
    }

    fn index_of_raw(&self, raw: u32) -> Option<usize> {
        self.levels
            .iter()
            .enumerate()
            .skip(FIRST_LEVEL_ENTRY)
            .find(|(_, value)| u32::try_from(*value).is_ok_and(|level| level == raw))
            .map(|(index, _)| index)
    }
}

impl FirmwareNode for VirtualNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_method(&self, method: FirmwareMethod) -> bool {
        self.methods.contains(&method)
    }

    fn evaluate(&self, method: FirmwareMethod, args: &[u32]) -> FirmwareResult<FirmwareValue> {
        if !self.has_method(method) {
            return Err(FirmwareError::method_missing(&self.name, method));
        }
        let mut state = self.state.lock();
        state.calls.push(method);
        if state.failing.contains(&method) {
            return Err(FirmwareError::call_failed(&self.name, method, "injected failure"));
        }

        match method {
            FirmwareMethod::QueryLevels => Ok(FirmwareValue::Package(self.levels.clone())),
            FirmwareMethod::ApplyLevel | FirmwareMethod::ApplyLevelExtended => {
                let raw = self.argument(method, args)?;
                state.current_raw = raw;
                state.writes.push(raw);
                Ok(FirmwareValue::Integer(0))
            }
            FirmwareMethod::QueryCurrent | FirmwareMethod::QueryCurrentExtended => {
                let raw = state.current_raw;
                let reported = if self.reports_index {
                    self.index_of_raw(raw)
                        .and_then(|index| u32::try_from(index).ok())
                        .unwrap_or(raw)
                } else {
                    raw
                };
                Ok(reported.into())
            }
            FirmwareMethod::SetControlMode => {
                state.control_mode = Some(self.argument(method, args)?);
                Ok(FirmwareValue::Integer(0))
            }
            FirmwareMethod::SaveLevel => {
                state.saved = Some(self.argument(method, args)?);
                Ok(FirmwareValue::Integer(0))
            }
            FirmwareMethod::QueryOptions => Ok(self.options.into()),
            FirmwareMethod::DebugLevel => {
                let value = self.argument(method, args)?;
                state.debug_values.push(value);
                Ok(value.into())
            }
        }
    }

    fn children(&self) -> Vec<NodeHandle> {
        self.children.clone()
    }
}

/// Builder for [`VirtualNode`].
#[derive(Debug)]
pub struct VirtualNodeBuilder {
    name: String,
    methods: BTreeSet<FirmwareMethod>,
    levels: Vec<FirmwareValue>,
    options: u32,
    reports_index: bool,
    current_raw: Option<u32>,
    children: Vec<NodeHandle>,
}

impl VirtualNodeBuilder {
    /// Expose `_BCL` with `levels` plus the standard `_BCM`/`_BQC` pair.
    #[must_use]
    pub fn backlight<I, V>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FirmwareValue>,
    {
        self.levels = levels.into_iter().map(Into::into).collect();
        self.methods.extend([
            FirmwareMethod::QueryLevels,
            FirmwareMethod::ApplyLevel,
            FirmwareMethod::QueryCurrent,
        ]);
        self
    }

    /// Swap the standard pair for `XBCM`/`XBQC`.
    #[must_use]
    pub fn extended(mut self) -> Self {
        self.methods.remove(&FirmwareMethod::ApplyLevel);
        self.methods.remove(&FirmwareMethod::QueryCurrent);
        self.methods.extend([
            FirmwareMethod::ApplyLevelExtended,
            FirmwareMethod::QueryCurrentExtended,
        ]);
        self
    }

    /// Expose `XOPT` returning `bits`.
    #[must_use]
    pub fn options(mut self, bits: u32) -> Self {
        self.options = bits;
        self.methods.insert(FirmwareMethod::QueryOptions);
        self
    }

    /// Expose `SAVE`.
    #[must_use]
    pub fn save(self) -> Self {
        self.with_method(FirmwareMethod::SaveLevel)
    }

    /// Expose `_DOS`.
    #[must_use]
    pub fn control(self) -> Self {
        self.with_method(FirmwareMethod::SetControlMode)
    }

    /// Expose `DEB1`.
    #[must_use]
    pub fn debug(self) -> Self {
        self.with_method(FirmwareMethod::DebugLevel)
    }

    /// Report a table index instead of a raw level from the query method.
    #[must_use]
    pub fn reports_index(mut self) -> Self {
        self.reports_index = true;
        self
    }

    /// Initial raw level. Defaults to the AC reference entry.
    #[must_use]
    pub fn current(mut self, raw: u32) -> Self {
        self.current_raw = Some(raw);
        self
    }

    /// Add a method.
    #[must_use]
    pub fn with_method(mut self, method: FirmwareMethod) -> Self {
        self.methods.insert(method);
        self
    }

    /// Remove a method.
    #[must_use]
    pub fn without_method(mut self, method: FirmwareMethod) -> Self {
        self.methods.remove(&method);
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, node: NodeHandle) -> Self {
        self.children.push(node);
        self
    }

    /// Finish the node.
    #[must_use]
    pub fn build(self) -> Arc<VirtualNode> {
        let current_raw = self
            .current_raw
            .or_else(|| self.levels.first().and_then(|v| u32::try_from(v).ok()))
            .unwrap_or(0);
        Arc::new(VirtualNode {
            name: self.name,
            methods: self.methods,
            levels: self.levels,
            options: self.options,
            reports_index: self.reports_index,
            children: self.children,
            state: Mutex::new(VirtualState {
                current_raw,
                ..VirtualState::default()
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_query() -> Result<(), FirmwareError> {
        let node = VirtualNode::builder("LCD")
            .backlight([5u32, 95, 10, 20, 30, 40])
            .build();
        assert_eq!(node.current_raw(), 5);

        node.evaluate(FirmwareMethod::ApplyLevel, &[30])?;
        let current = node.evaluate(FirmwareMethod::QueryCurrent, &[])?;
        assert_eq!(current, FirmwareValue::Integer(30));
        assert_eq!(node.writes(), vec![30]);
        Ok(())
    }

    #[test]
    fn test_reports_index_into_raw_package() -> Result<(), FirmwareError> {
        let node = VirtualNode::builder("LCD")
            .backlight([20u32, 20, 10, 20, 30, 40])
            .reports_index()
            .current(30)
            .build();
        let current = node.evaluate(FirmwareMethod::QueryCurrent, &[])?;
        assert_eq!(current, FirmwareValue::Integer(4));
        Ok(())
    }

    #[test]
    fn test_missing_and_failing_methods() {
        let node = VirtualNode::builder("LCD")
            .backlight([0u32, 0, 10, 20])
            .build();
        assert!(matches!(
            node.evaluate(FirmwareMethod::SaveLevel, &[1]),
            Err(FirmwareError::MethodMissing { .. })
        ));

        node.fail_method(FirmwareMethod::ApplyLevel);
        assert!(matches!(
            node.evaluate(FirmwareMethod::ApplyLevel, &[10]),
            Err(FirmwareError::CallFailed { .. })
        ));
        assert_eq!(node.apply_count(), 0);

        node.restore(FirmwareMethod::ApplyLevel);
        assert!(matches!(node.evaluate(FirmwareMethod::ApplyLevel, &[10]), Ok(_)));
        assert_eq!(node.apply_count(), 1);
    }

    #[test]
    fn test_missing_argument() {
        let node = VirtualNode::builder("GFX0").control().build();
        assert!(matches!(
            node.evaluate(FirmwareMethod::SetControlMode, &[]),
            Err(FirmwareError::CallFailed { .. })
        ));
        assert_eq!(node.control_mode(), None);
    }
}
