//! Level packages and firmware trees used across the test suites.

use std::sync::Arc;

use acpi_backlight_firmware::{NodeHandle, VirtualNode, VirtualNodeBuilder};

/// Ascending `_BCL`: AC minimum 5, battery maximum 95, levels 10..=40.
pub const ASCENDING_BCL: [u32; 6] = [5, 95, 10, 20, 30, 40];

/// Descending `_BCL`, kept whole and reversed by the normalizer.
pub const DESCENDING_BCL: [u32; 6] = [95, 5, 40, 30, 20, 10];

/// A typical eleven-step laptop panel.
pub const LAPTOP_BCL: [u32; 13] = [100, 40, 0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100];

/// A wide extended-range panel, 0..=0x700 in 0x70 steps.
pub const EXTENDED_BCL: [u32; 19] = [
    0x380, 0x700, 0x000, 0x070, 0x0e0, 0x150, 0x1c0, 0x230, 0x2a0, 0x310, 0x380, 0x3f0, 0x460,
    0x4d0, 0x540, 0x5b0, 0x620, 0x690, 0x700,
];

/// Name of the display output node in [`PanelFixture`] trees.
pub const PANEL_NODE: &str = "DD02";

/// `_SB.PCI0.GFX0.DD02`: a graphics control node with one panel child and a
/// CRT output next to it.
#[derive(Debug, Clone)]
pub struct PanelFixture {
    /// Tree root (`_SB`).
    pub root: NodeHandle,
    /// Provider node handed to discovery; never a backlight itself.
    pub provider: NodeHandle,
    /// `GFX0`.
    pub control: Arc<VirtualNode>,
    /// `DD02`.
    pub panel: Arc<VirtualNode>,
}

impl PanelFixture {
    /// Build a tree whose panel node is configured by `configure`.
    pub fn new(configure: impl FnOnce(VirtualNodeBuilder) -> VirtualNodeBuilder) -> Self {
        let panel = configure(VirtualNode::builder(PANEL_NODE)).build();
        let crt = VirtualNode::builder("CRT1").build();
        let control = VirtualNode::builder("GFX0")
            .control()
            .child(crt)
            .child(panel.clone())
            .build();
        let pci = VirtualNode::builder("PCI0").child(control.clone()).build();
        let root: NodeHandle = VirtualNode::builder("_SB").child(pci).build();
        let provider: NodeHandle = VirtualNode::builder("PNLF").build();
        Self {
            root,
            provider,
            control,
            panel,
        }
    }

    /// Standard `_BCM`/`_BQC` panel with `levels`.
    pub fn standard(levels: &[u32]) -> Self {
        let levels = levels.to_vec();
        Self::new(|panel| panel.backlight(levels))
    }

    /// Extended `XBCM`/`XBQC` panel with `levels`.
    pub fn extended(levels: &[u32]) -> Self {
        let levels = levels.to_vec();
        Self::new(|panel| panel.backlight(levels).extended())
    }

    /// Dot path of the panel node.
    pub fn panel_path() -> String {
        format!("_SB.PCI0.GFX0.{PANEL_NODE}")
    }
}
