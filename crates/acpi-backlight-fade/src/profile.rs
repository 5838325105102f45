//! Adaptive step profiles.
//!
//! A profile says how far one fade tick moves the level and how long to wait
//! before the next tick, for distances up to `delta_threshold`. Large distances
//! use coarse steps, and the controller drops to finer profiles as it closes in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FadeError, FadeResult};

/// Threshold used by the catch-all last profile.
pub const UNBOUNDED_DELTA: u32 = u32::MAX;

/// One row of the step profile table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProfile {
    /// Largest distance this profile is selected for.
    pub delta_threshold: u32,
    /// Level change per tick.
    pub step: u32,
    /// Delay between ticks in microseconds.
    pub timeout_micros: u32,
}

impl StepProfile {
    /// Create a profile.
    #[must_use]
    pub const fn new(delta_threshold: u32, step: u32, timeout_micros: u32) -> Self {
        Self {
            delta_threshold,
            step,
            timeout_micros,
        }
    }

    /// Tick delay as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_micros(u64::from(self.timeout_micros))
    }
}

/// Profiles shipped with the driver.
pub const DEFAULT_PROFILES: [StepProfile; 3] = [
    StepProfile::new(0x10, 1, 10_000),
    StepProfile::new(0x40, 4, 10_000),
    StepProfile::new(UNBOUNDED_DELTA, 16, 10_000),
];

/// Validated, ascending table of step profiles.
///
/// Never empty, every step is at least 1, thresholds never decrease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StepProfile>", into = "Vec<StepProfile>")]
pub struct StepProfileTable {
    entries: Vec<StepProfile>,
}

impl StepProfileTable {
    /// Build a table from profiles.
    ///
    /// # Errors
    ///
    /// Returns [`FadeError`] if the table is empty, has a zero step, or its
    /// thresholds are not ascending.
    pub fn new(entries: Vec<StepProfile>) -> FadeResult<Self> {
        validate(&entries)?;
        Ok(Self { entries })
    }

    /// All profiles in order.
    #[must_use]
    pub fn entries(&self) -> &[StepProfile] {
        &self.entries
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Profile at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StepProfile> {
        self.entries.get(index)
    }

    /// Index of the first profile whose threshold covers `distance`, or the
    /// last profile when none does.
    #[must_use]
    pub fn select(&self, distance: u32) -> usize {
        self.entries
            .iter()
            .position(|p| p.delta_threshold >= distance)
            .unwrap_or_else(|| self.last_index())
    }

    /// Index of the last profile.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    /// Smallest step of any profile.
    #[must_use]
    pub fn smallest_step(&self) -> u32 {
        self.entries.iter().map(|p| p.step).min().unwrap_or(1)
    }

    /// Edit a copy of the profiles and install it if it still validates.
    ///
    /// On error the current table is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the edited table.
    pub fn update<F>(&mut self, edit: F) -> FadeResult<()>
    where
        F: FnOnce(&mut [StepProfile]),
    {
        let mut edited = self.entries.clone();
        edit(&mut edited);
        validate(&edited)?;
        self.entries = edited;
        Ok(())
    }

    /// Replace one profile, validating the resulting table.
    ///
    /// # Errors
    ///
    /// Returns [`FadeError::IndexOutOfRange`] for a bad index, or the
    /// validation error of the edited table.
    pub fn set(&mut self, index: usize, profile: StepProfile) -> FadeResult<()> {
        let len = self.entries.len();
        if index >= len {
            return Err(FadeError::IndexOutOfRange { index, len });
        }
        self.update(|entries| {
            if let Some(slot) = entries.get_mut(index) {
                *slot = profile;
            }
        })
    }
}

impl Default for StepProfileTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_PROFILES.to_vec(),
        }
    }
}

impl TryFrom<Vec<StepProfile>> for StepProfileTable {
    type Error = FadeError;

    fn try_from(entries: Vec<StepProfile>) -> FadeResult<Self> {
        Self::new(entries)
    }
}

impl From<StepProfileTable> for Vec<StepProfile> {
    fn from(table: StepProfileTable) -> Self {
        table.entries
    }
}

fn validate(entries: &[StepProfile]) -> FadeResult<()> {
    if entries.is_empty() {
        return Err(FadeError::EmptyProfileTable);
    }
    let mut previous: Option<u32> = None;
    for (index, profile) in entries.iter().enumerate() {
        if profile.step == 0 {
            return Err(FadeError::zero_step(index));
        }
        if previous.is_some_and(|prev| profile.delta_threshold < prev) {
            return Err(FadeError::unordered_thresholds(index));
        }
        previous = Some(profile.delta_threshold);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_default_profiles() {
        let table = StepProfileTable::default();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2).map(|p| p.delta_threshold), Some(UNBOUNDED_DELTA));
        assert_eq!(table.smallest_step(), 1);
        assert_eq!(
            table.get(0).map(StepProfile::timeout),
            Some(Duration::from_millis(10))
        );
    }

    #[test]
    fn test_select_first_covering_threshold() {
        let table = StepProfileTable::default();
        assert_eq!(table.select(0), 0);
        assert_eq!(table.select(0x10), 0);
        assert_eq!(table.select(0x11), 1);
        assert_eq!(table.select(0x40), 1);
        assert_eq!(table.select(500), 2);
    }

    #[test]
    fn test_select_falls_back_to_last() {
        let table = must(StepProfileTable::new(vec![
            StepProfile::new(10, 1, 1000),
            StepProfile::new(100, 5, 1000),
        ]));
        assert_eq!(table.select(1000), 1);
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        assert_eq!(
            StepProfileTable::new(Vec::new()),
            Err(FadeError::EmptyProfileTable)
        );
        assert_eq!(
            StepProfileTable::new(vec![StepProfile::new(10, 0, 1)]),
            Err(FadeError::zero_step(0))
        );
        assert_eq!(
            StepProfileTable::new(vec![
                StepProfile::new(50, 1, 1),
                StepProfile::new(10, 1, 1),
            ]),
            Err(FadeError::unordered_thresholds(1))
        );
    }

    #[test]
    fn test_rejected_update_keeps_previous_table() {
        let mut table = StepProfileTable::default();
        let before = table.clone();

        let result = table.set(1, StepProfile::new(0x40, 0, 10_000));
        assert_eq!(result, Err(FadeError::zero_step(1)));
        assert_eq!(table, before);

        assert!(matches!(
            table.set(7, StepProfile::new(1, 1, 1)),
            Err(FadeError::IndexOutOfRange { index: 7, len: 3 })
        ));
    }

    #[test]
    fn test_accepted_update() {
        let mut table = StepProfileTable::default();
        must(table.update(|entries| {
            if let Some(p) = entries.get_mut(1) {
                p.step = 8;
            }
        }));
        assert_eq!(table.get(1).map(|p| p.step), Some(8));
    }

    #[test]
    fn test_serde_validates() {
        let json = r#"[{"delta_threshold":16,"step":2,"timeout_micros":5000}]"#;
        let table: StepProfileTable = must(serde_json::from_str(json));
        assert_eq!(table.smallest_step(), 2);

        let bad = r#"[{"delta_threshold":16,"step":0,"timeout_micros":5000}]"#;
        assert!(matches!(serde_json::from_str::<StepProfileTable>(bad), Err(_)));
    }
}
