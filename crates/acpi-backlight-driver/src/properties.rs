//! Property keys and the published property map.

use std::fmt;

use acpi_backlight_fade::StepProfileTable;
use serde_json::Value;

/// Key/value properties as published and accepted by a panel.
pub type PropertyMap = serde_json::Map<String, Value>;

/// Last queried raw level. Writing it applies a raw level directly.
pub const RAW_BRIGHTNESS: &str = "RawBrightness";
/// Whether the query-current method reports a `_BCL` position.
pub const BQC_USE_INDEX: &str = "BQC use index";
/// Prefix of the per-profile delta threshold keys.
pub const SMOOTH_DELTA: &str = "SmoothDelta";
/// Prefix of the per-profile step keys.
pub const SMOOTH_STEP: &str = "SmoothStep";
/// Prefix of the per-profile tick delay keys (microseconds).
pub const SMOOTH_TIMEOUT: &str = "SmoothTimeout";
/// Raw sweep diagnostic.
#[cfg(feature = "diagnostics")]
pub const CYCLE_TEST: &str = "CycleTest";
/// `DEB1` passthrough diagnostic.
#[cfg(feature = "diagnostics")]
pub const KLVX: &str = "KLVX";

/// A recognized property key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// [`RAW_BRIGHTNESS`].
    RawBrightness,
    /// [`BQC_USE_INDEX`].
    BqcUseIndex,
    /// `SmoothDelta{i}`.
    SmoothDelta(usize),
    /// `SmoothStep{i}`.
    SmoothStep(usize),
    /// `SmoothTimeout{i}`.
    SmoothTimeout(usize),
    /// [`CYCLE_TEST`].
    #[cfg(feature = "diagnostics")]
    CycleTest,
    /// [`KLVX`].
    #[cfg(feature = "diagnostics")]
    Klvx,
}

impl PropertyKey {
    /// Recognize `key`. Unknown keys yield `None`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            RAW_BRIGHTNESS => return Some(Self::RawBrightness),
            BQC_USE_INDEX => return Some(Self::BqcUseIndex),
            #[cfg(feature = "diagnostics")]
            CYCLE_TEST => return Some(Self::CycleTest),
            #[cfg(feature = "diagnostics")]
            KLVX => return Some(Self::Klvx),
            _ => {}
        }
        if let Some(index) = indexed(key, SMOOTH_DELTA) {
            return Some(Self::SmoothDelta(index));
        }
        if let Some(index) = indexed(key, SMOOTH_STEP) {
            return Some(Self::SmoothStep(index));
        }
        indexed(key, SMOOTH_TIMEOUT).map(Self::SmoothTimeout)
    }

    /// Whether the key edits the step profile table.
    #[must_use]
    pub fn is_profile_key(self) -> bool {
        matches!(
            self,
            Self::SmoothDelta(_) | Self::SmoothStep(_) | Self::SmoothTimeout(_)
        )
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RawBrightness => f.write_str(RAW_BRIGHTNESS),
            Self::BqcUseIndex => f.write_str(BQC_USE_INDEX),
            Self::SmoothDelta(i) => write!(f, "{SMOOTH_DELTA}{i}"),
            Self::SmoothStep(i) => write!(f, "{SMOOTH_STEP}{i}"),
            Self::SmoothTimeout(i) => write!(f, "{SMOOTH_TIMEOUT}{i}"),
            #[cfg(feature = "diagnostics")]
            Self::CycleTest => f.write_str(CYCLE_TEST),
            #[cfg(feature = "diagnostics")]
            Self::Klvx => f.write_str(KLVX),
        }
    }
}

fn indexed(key: &str, prefix: &str) -> Option<usize> {
    let digits = key.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `SmoothDelta{i}`, `SmoothStep{i}` and `SmoothTimeout{i}` for every profile.
#[must_use]
pub fn profile_properties(profiles: &StepProfileTable) -> PropertyMap {
    let mut map = PropertyMap::new();
    for (index, profile) in profiles.entries().iter().enumerate() {
        map.insert(
            PropertyKey::SmoothDelta(index).to_string(),
            profile.delta_threshold.into(),
        );
        map.insert(PropertyKey::SmoothStep(index).to_string(), profile.step.into());
        map.insert(
            PropertyKey::SmoothTimeout(index).to_string(),
            profile.timeout_micros.into(),
        );
    }
    map
}

/// Integer property value that fits 32 bits.
pub(crate) fn value_as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

/// Boolean property value; integers count as true when non-zero.
pub(crate) fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        other => other.as_u64().map(|n| n != 0),
    }
}
