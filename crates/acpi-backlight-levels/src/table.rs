//! Firmware level table normalization.
//!
//! The firmware `_BCL` package is laid out as:
//!
//! ```text
//! [ac_min, bat_max, level, level, ...]
//! ```
//!
//! where the first two entries are reference values (the level the firmware
//! uses on AC power and on battery) and the remainder lists every raw level the
//! panel accepts. Some firmware presents the level list in descending order.

use serde::{Deserialize, Serialize};

use crate::error::{LevelTableError, LevelTableResult};

/// Number of reference entries at the start of the firmware list.
const REFERENCE_ENTRIES: usize = 2;

/// Shortest firmware list the normalizer accepts.
pub const MIN_RAW_ENTRIES: usize = REFERENCE_ENTRIES + 1;

/// Normalized table of raw firmware brightness levels.
///
/// Built once when a panel attaches and immutable afterwards. An empty table is
/// the degraded form produced for malformed firmware data; every consumer treats
/// it as "no mapping available".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrightnessTable {
    levels: Vec<u32>,
    ac_min_index: usize,
    bat_max_index: usize,
    raw_ac_min: u32,
    raw_bat_max: u32,
    reversed: bool,
}

impl BrightnessTable {
    /// Create the empty (degraded) table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize a raw firmware list of integers.
    ///
    /// # Errors
    ///
    /// Returns [`LevelTableError::TooFewEntries`] when the list has fewer than
    /// [`MIN_RAW_ENTRIES`] entries.
    pub fn normalize(raw: &[u32]) -> LevelTableResult<Self> {
        Self::from_entries(raw.iter().copied())
    }

    /// Normalize a raw firmware list whose entries may not all be integers.
    ///
    /// If `raw[2] > raw[N-1]` the list is presented in descending order and the
    /// normalized table holds all `N` entries fully reversed, reference entries
    /// included. Otherwise the two reference entries are dropped and the
    /// remaining `N-2` levels keep their order. The reference indices are then
    /// looked up against the normalized table with [`Self::nearest_index`].
    ///
    /// # Errors
    ///
    /// Returns [`LevelTableError::TooFewEntries`] for short lists and
    /// [`LevelTableError::NonIntegral`] for the first entry that does not convert
    /// to `u32`.
    pub fn from_entries<I, T>(entries: I) -> LevelTableResult<Self>
    where
        I: IntoIterator<Item = T>,
        u32: TryFrom<T>,
    {
        let raw = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match u32::try_from(entry) {
                Ok(level) => Ok(level),
                Err(_) => Err(LevelTableError::non_integral(index)),
            })
            .collect::<LevelTableResult<Vec<u32>>>()?;

        let (raw_ac_min, raw_bat_max, third, last) =
            match (raw.first(), raw.get(1), raw.get(2), raw.last()) {
                (Some(&ac), Some(&bat), Some(&third), Some(&last)) => (ac, bat, third, last),
                _ => {
                    return Err(LevelTableError::too_few_entries(
                        raw.len(),
                        MIN_RAW_ENTRIES,
                    ));
                }
            };

        let reversed = third > last;
        let levels: Vec<u32> = if reversed {
            raw.iter().rev().copied().collect()
        } else {
            raw.iter().skip(REFERENCE_ENTRIES).copied().collect()
        };

        let mut table = Self {
            levels,
            ac_min_index: 0,
            bat_max_index: 0,
            raw_ac_min,
            raw_bat_max,
            reversed,
        };
        table.ac_min_index = table.nearest_index(raw_ac_min);
        table.bat_max_index = table.nearest_index(raw_bat_max);

        if !table.is_strictly_ascending() {
            tracing::warn!(
                levels = ?table.levels,
                reversed,
                "Normalized level table is not strictly ascending"
            );
        }

        tracing::debug!(
            count = table.levels.len(),
            ac_min_index = table.ac_min_index,
            bat_max_index = table.bat_max_index,
            reversed,
            "Built brightness level table"
        );

        Ok(table)
    }

    /// Like [`Self::from_entries`], but degrades to the empty table on error.
    pub fn from_entries_or_empty<I, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = T>,
        u32: TryFrom<T>,
    {
        match Self::from_entries(entries) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed firmware level list, mapping disabled");
                Self::empty()
            }
        }
    }

    /// Closest-without-exceeding search.
    ///
    /// Scans from index 0 and returns the index just before the first level that
    /// exceeds `target`. Returns 0 when the first level already exceeds it and the
    /// last index when none does. On a strictly ascending table this is the
    /// highest index whose level is `<= target`. Returns 0 for an empty table.
    #[must_use]
    pub fn nearest_index(&self, target: u32) -> usize {
        match self.levels.iter().position(|&level| level > target) {
            Some(first_above) => first_above.saturating_sub(1),
            None => self.levels.len().saturating_sub(1),
        }
    }

    /// Normalized raw levels.
    #[must_use]
    pub fn levels(&self) -> &[u32] {
        &self.levels
    }

    /// Raw level at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u32> {
        self.levels.get(index).copied()
    }

    /// Number of levels in the normalized table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the table is the degraded empty table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Last valid index, `None` for the empty table.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.levels.len().checked_sub(1)
    }

    /// Index nearest to the firmware's AC-minimum reference level.
    #[must_use]
    pub fn ac_min_index(&self) -> usize {
        self.ac_min_index
    }

    /// Index nearest to the firmware's battery-maximum reference level.
    #[must_use]
    pub fn bat_max_index(&self) -> usize {
        self.bat_max_index
    }

    /// The AC-minimum reference value as reported by firmware.
    #[must_use]
    pub fn raw_ac_min(&self) -> u32 {
        self.raw_ac_min
    }

    /// The battery-maximum reference value as reported by firmware.
    #[must_use]
    pub fn raw_bat_max(&self) -> u32 {
        self.raw_bat_max
    }

    /// Whether firmware presented the list in descending order.
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Whether every level is strictly greater than the one before it.
    #[must_use]
    pub fn is_strictly_ascending(&self) -> bool {
        self.levels.windows(2).all(|pair| match pair {
            [low, high] => low < high,
            _ => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_ascending_list_drops_reference_entries() {
        let table = must(BrightnessTable::normalize(&[5, 95, 10, 20, 30, 40]));
        assert_eq!(table.levels(), &[10, 20, 30, 40]);
        assert_eq!(table.ac_min_index(), 0);
        assert_eq!(table.bat_max_index(), 3);
        assert!(!table.is_reversed());
        assert!(table.is_strictly_ascending());
    }

    #[test]
    fn test_descending_list_keeps_all_entries_reversed() {
        let table = must(BrightnessTable::normalize(&[95, 5, 40, 30, 20, 10]));
        assert_eq!(table.levels(), &[10, 20, 30, 40, 5, 95]);
        assert_eq!(table.len(), 6);
        assert!(table.is_reversed());
        assert!(!table.is_strictly_ascending());
    }

    #[test]
    fn test_reference_indices_on_reversed_table() {
        let table = must(BrightnessTable::normalize(&[95, 5, 40, 30, 20, 10]));
        // 95 is never exceeded, 5 is exceeded by the first entry.
        assert_eq!(table.ac_min_index(), 5);
        assert_eq!(table.bat_max_index(), 0);
        assert_eq!(table.raw_ac_min(), 95);
        assert_eq!(table.raw_bat_max(), 5);
    }

    #[test]
    fn test_short_lists_are_rejected() {
        assert_eq!(
            BrightnessTable::normalize(&[1, 2]),
            Err(LevelTableError::too_few_entries(2, 3))
        );
        assert!(matches!(BrightnessTable::normalize(&[]), Err(_)));
        assert!(BrightnessTable::from_entries_or_empty([7u32]).is_empty());
    }

    #[test]
    fn test_three_entries_yield_single_level() {
        let table = must(BrightnessTable::normalize(&[10, 90, 50]));
        assert_eq!(table.levels(), &[50]);
        assert_eq!(table.last_index(), Some(0));
    }

    #[test]
    fn test_non_integral_entry_is_rejected() {
        let raw: [i64; 4] = [10, 90, -1, 100];
        assert_eq!(
            BrightnessTable::from_entries(raw),
            Err(LevelTableError::non_integral(2))
        );
        assert!(BrightnessTable::from_entries_or_empty(raw).is_empty());
    }

    #[test]
    fn test_nearest_index_policy() {
        let table = must(BrightnessTable::normalize(&[0, 0, 10, 20, 30, 40]));
        assert_eq!(table.nearest_index(0), 0);
        assert_eq!(table.nearest_index(10), 0);
        assert_eq!(table.nearest_index(19), 0);
        assert_eq!(table.nearest_index(20), 1);
        assert_eq!(table.nearest_index(35), 2);
        assert_eq!(table.nearest_index(40), 3);
        assert_eq!(table.nearest_index(u32::MAX), 3);
    }

    #[test]
    fn test_empty_table_accessors() {
        let table = BrightnessTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.last_index(), None);
        assert_eq!(table.nearest_index(50), 0);
        assert_eq!(table.get(0), None);
    }

    #[test]
    fn test_table_serializes() {
        let table = must(BrightnessTable::normalize(&[5, 95, 10, 20, 30, 40]));
        let json = must(serde_json::to_value(&table));
        assert_eq!(json["levels"], serde_json::json!([10, 20, 30, 40]));
        assert_eq!(json["bat_max_index"], 3);
    }
}
