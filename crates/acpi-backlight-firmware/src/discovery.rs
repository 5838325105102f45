//! Locating the control and backlight nodes in the firmware tree.

use std::sync::Arc;

use crate::capability::DeviceCapability;
use crate::device::BacklightDevice;
use crate::error::{FirmwareError, FirmwareResult};
use crate::method::FirmwareMethod;
use crate::node::NodeHandle;

/// Find the backlight device for `provider`.
///
/// If the provider itself supports backlight control it serves as both the
/// control and the backlight node; its path is taken from its position under
/// `root`, or is its bare name when it sits outside that tree. Otherwise the tree under `root` is walked
/// depth-first and the first node with `_DOS` becomes the control node; the
/// backlight node is the control node itself when it qualifies, else its first
/// direct child that does.
///
/// # Errors
///
/// Returns [`FirmwareError::DiscoveryFailed`] when no usable pair is found.
pub fn discover(provider: &NodeHandle, root: &NodeHandle) -> FirmwareResult<BacklightDevice> {
    if let Some(capability) = DeviceCapability::probe(provider.as_ref()) {
        let path = path_in_tree(root, provider).unwrap_or_else(|| provider.name().to_string());
        tracing::info!(path = %path, "Provider exposes backlight methods");
        return Ok(BacklightDevice::new(
            provider.clone(),
            path.clone(),
            provider.clone(),
            path,
            capability,
        ));
    }

    let (control, control_path) = find_control_node(root).ok_or_else(|| {
        FirmwareError::discovery_failed(format!(
            "no node with {} under {}",
            FirmwareMethod::SetControlMode,
            root.name()
        ))
    })?;
    tracing::debug!(path = %control_path, "Found control node");

    if let Some(capability) = DeviceCapability::probe(control.as_ref()) {
        tracing::info!(path = %control_path, "Control node exposes backlight methods");
        return Ok(BacklightDevice::new(
            control.clone(),
            control_path.clone(),
            control,
            control_path,
            capability,
        ));
    }

    for child in control.children() {
        if let Some(capability) = DeviceCapability::probe(child.as_ref()) {
            let backlight_path = join_path(&control_path, child.name());
            tracing::info!(
                control = %control_path,
                backlight = %backlight_path,
                "Found backlight device"
            );
            return Ok(BacklightDevice::new(
                control,
                control_path,
                child,
                backlight_path,
                capability,
            ));
        }
    }

    Err(FirmwareError::discovery_failed(format!(
        "{control_path} has no child with backlight methods"
    )))
}

/// Pre-order depth-first search for the first node with `_DOS`.
fn find_control_node(root: &NodeHandle) -> Option<(NodeHandle, String)> {
    let mut stack = vec![(root.clone(), root.name().to_string())];
    while let Some((node, path)) = stack.pop() {
        if node.has_method(FirmwareMethod::SetControlMode) {
            return Some((node, path));
        }
        let children = node.children();
        stack.extend(
            children
                .into_iter()
                .rev()
                .map(|child| {
                    let child_path = join_path(&path, child.name());
                    (child, child_path)
                }),
        );
    }
    None
}

/// Dot path of `target` under `root`, matched by identity.
fn path_in_tree(root: &NodeHandle, target: &NodeHandle) -> Option<String> {
    let mut stack = vec![(root.clone(), root.name().to_string())];
    while let Some((node, path)) = stack.pop() {
        if same_node(&node, target) {
            return Some(path);
        }
        for child in node.children() {
            let child_path = join_path(&path, child.name());
            stack.push((child, child_path));
        }
    }
    None
}

fn same_node(a: &NodeHandle, b: &NodeHandle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_node::VirtualNode;

    fn must<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "_SB"), "_SB");
        assert_eq!(join_path("_SB.PCI0", "GFX0"), "_SB.PCI0.GFX0");
    }

    #[test]
    fn test_provider_with_methods_is_both_nodes() {
        let pnlf = VirtualNode::builder("PNLF")
            .backlight([0u32, 0, 10, 20])
            .extended()
            .build();
        let provider: NodeHandle = pnlf;
        let root: NodeHandle = VirtualNode::builder("").build();

        let device = must(discover(&provider, &root));
        assert_eq!(device.control_path(), "PNLF");
        assert_eq!(device.backlight_path(), "PNLF");
        assert!(device.is_single_node());
    }

    #[test]
    fn test_provider_inside_tree_gets_full_path() {
        let pnlf: NodeHandle = VirtualNode::builder("PNLF")
            .backlight([0u32, 0, 10, 20])
            .build();
        let pci = VirtualNode::builder("PCI0").child(pnlf.clone()).build();
        let root: NodeHandle = VirtualNode::builder("_SB").child(pci).build();

        let device = must(discover(&pnlf, &root));
        assert_eq!(device.control_path(), "_SB.PCI0.PNLF");
        assert_eq!(device.backlight_path(), "_SB.PCI0.PNLF");
    }

    #[test]
    fn test_preorder_picks_first_control_node() {
        let first = VirtualNode::builder("GFX0")
            .control()
            .backlight([0u32, 0, 1, 2])
            .build();
        let second = VirtualNode::builder("GFX1")
            .control()
            .backlight([0u32, 0, 5, 6])
            .build();
        let pci = VirtualNode::builder("PCI0").child(first).build();
        let root: NodeHandle = VirtualNode::builder("_SB").child(pci).child(second).build();
        let provider: NodeHandle = VirtualNode::builder("PNLF").build();

        let device = must(discover(&provider, &root));
        assert_eq!(device.control_path(), "_SB.PCI0.GFX0");
    }
}
