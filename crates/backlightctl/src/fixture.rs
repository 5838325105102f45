//! Virtual firmware trees described in JSON.
//!
//! A fixture names a provider node and a tree root. Each node lists the
//! firmware methods it implements; a node with `levels` gets the backlight
//! method set (`_BCL` plus `_BCM`/`_BQC`, or `XBCM`/`XBQC` when `extended`).

use std::path::Path;
use std::sync::Arc;

use acpi_backlight_firmware::{FirmwareMethod, NodeHandle, VirtualNode};
use serde::Deserialize;

use crate::error::CliError;

/// Fixture used when `--fixture` is not given.
pub const DEFAULT_FIXTURE: &str = include_str!("../fixtures/default-panel.json");

/// One node of a fixture tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeDescription {
    pub name: String,
    pub levels: Vec<u32>,
    pub extended: bool,
    pub options: Option<u32>,
    pub methods: Vec<FirmwareMethod>,
    pub current: Option<u32>,
    pub reports_index: bool,
    pub children: Vec<NodeDescription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureFile {
    pub provider: NodeDescription,
    pub root: NodeDescription,
}

/// A built fixture tree.
#[derive(Debug, Clone)]
pub struct FirmwareTree {
    pub provider: NodeHandle,
    pub root: NodeHandle,
    nodes: Vec<(String, Arc<VirtualNode>)>,
}

impl FirmwareTree {
    /// Load a fixture file, or the built-in panel when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let json = match path {
            Some(path) => std::fs::read_to_string(path)?,
            None => DEFAULT_FIXTURE.to_string(),
        };
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CliError> {
        let desc: FixtureFile = serde_json::from_str(json)?;
        Self::build(&desc)
    }

    pub fn build(desc: &FixtureFile) -> Result<Self, CliError> {
        let mut nodes = Vec::new();
        let provider = build_node(&desc.provider, None, &mut nodes)?;
        let root = build_node(&desc.root, None, &mut nodes)?;
        tracing::debug!(nodes = nodes.len(), "Built fixture tree");
        Ok(Self {
            provider,
            root,
            nodes,
        })
    }

    /// Node at a dot path such as `_SB.PCI0.GFX0.DD02`.
    pub fn node(&self, path: &str) -> Result<Arc<VirtualNode>, CliError> {
        self.nodes
            .iter()
            .find(|(node_path, _)| node_path == path)
            .map(|(_, node)| node.clone())
            .ok_or_else(|| CliError::BacklightNotFound(format!("{path} is not in the fixture tree")))
    }
}

fn build_node(
    desc: &NodeDescription,
    parent: Option<&str>,
    nodes: &mut Vec<(String, Arc<VirtualNode>)>,
) -> Result<NodeHandle, CliError> {
    if desc.name.is_empty() {
        return Err(CliError::InvalidFixture(match parent {
            Some(parent) => format!("unnamed child under {parent}"),
            None => "unnamed top-level node".to_string(),
        }));
    }
    let path = match parent {
        Some(parent) => format!("{parent}.{}", desc.name),
        None => desc.name.clone(),
    };

    let mut builder = VirtualNode::builder(desc.name.as_str());
    if !desc.levels.is_empty() {
        builder = builder.backlight(desc.levels.iter().copied());
    } else if desc.extended || desc.reports_index || desc.current.is_some() {
        return Err(CliError::InvalidFixture(format!(
            "{path} configures a backlight but has no levels"
        )));
    }
    if desc.extended {
        builder = builder.extended();
    }
    if let Some(bits) = desc.options {
        builder = builder.options(bits);
    }
    if desc.reports_index {
        builder = builder.reports_index();
    }
    if let Some(raw) = desc.current {
        builder = builder.current(raw);
    }
    for method in &desc.methods {
        builder = builder.with_method(*method);
    }
    for child in &desc.children {
        builder = builder.child(build_node(child, Some(&path), nodes)?);
    }

    let node = builder.build();
    nodes.push((path, node.clone()));
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use acpi_backlight_firmware::FirmwareNode;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_default_fixture_builds() -> TestResult {
        let tree = FirmwareTree::load(None)?;
        assert_eq!(tree.root.name(), "_SB");
        assert_eq!(tree.provider.name(), "PNLF");
        assert!(!tree.provider.supports_backlight_control());

        let panel = tree.node("_SB.PCI0.GFX0.DD02")?;
        assert!(panel.supports_backlight_control());
        assert!(panel.has_method(FirmwareMethod::ApplyLevelExtended));
        assert!(panel.has_method(FirmwareMethod::SaveLevel));
        assert_eq!(panel.current_raw(), 896);

        let control = tree.node("_SB.PCI0.GFX0")?;
        assert!(control.has_method(FirmwareMethod::SetControlMode));
        Ok(())
    }

    #[test]
    fn test_every_node_is_addressable() -> TestResult {
        let tree = FirmwareTree::load(None)?;
        for path in ["PNLF", "_SB", "_SB.PCI0", "_SB.PCI0.GFX0", "_SB.PCI0.GFX0.CRT1"] {
            assert_eq!(tree.node(path)?.name(), path.rsplit('.').next().unwrap_or(path));
        }
        Ok(())
    }

    #[test]
    fn test_unknown_node_is_not_found() -> TestResult {
        let tree = FirmwareTree::load(None)?;
        assert!(matches!(
            tree.node("_SB.PCI0.GFX1"),
            Err(CliError::BacklightNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_backlight_flags_without_levels_rejected() {
        let json = r#"{
            "provider": { "name": "PNLF" },
            "root": { "name": "GFX0", "methods": ["_DOS"], "extended": true }
        }"#;
        assert!(matches!(
            FirmwareTree::from_json_str(json),
            Err(CliError::InvalidFixture(_))
        ));
    }

    #[test]
    fn test_unnamed_node_rejected() {
        let json = r#"{
            "provider": { "name": "PNLF" },
            "root": { "name": "GFX0", "children": [{ "levels": [1, 2, 3] }] }
        }"#;
        assert!(matches!(
            FirmwareTree::from_json_str(json),
            Err(CliError::InvalidFixture(_))
        ));
    }

    #[test]
    fn test_unknown_method_name_rejected() {
        let json = r#"{
            "provider": { "name": "PNLF" },
            "root": { "name": "GFX0", "methods": ["_ADR"] }
        }"#;
        assert!(matches!(
            FirmwareTree::from_json_str(json),
            Err(CliError::JsonError(_))
        ));
    }
}
