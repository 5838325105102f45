//! Integer arithmetic between the normalized scale and the level table.

use crate::error::{LevelTableError, LevelTableResult};
use crate::table::BrightnessTable;

/// Upper bound of the normalized OS brightness scale.
pub const SCALE_MAX: u32 = 1024;

const SCALE_MAX_U64: u64 = SCALE_MAX as u64;

/// Maps between normalized levels `[0, SCALE_MAX]`, table indices and raw
/// firmware values.
///
/// The mapper owns its table and the valid index bounds `lo..=hi`. When
/// `lo == hi` (empty or single-entry table) every operation is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleMapper {
    table: BrightnessTable,
    lo: usize,
    hi: usize,
}

impl ScaleMapper {
    /// Create a mapper spanning the whole table.
    #[must_use]
    pub fn new(table: BrightnessTable) -> Self {
        let hi = table.last_index().unwrap_or(0);
        Self { table, lo: 0, hi }
    }

    /// Create a mapper restricted to `lo..=hi`.
    ///
    /// # Errors
    ///
    /// Returns [`LevelTableError::InvalidBounds`] when `lo > hi` or `hi` is past
    /// the end of a non-empty table.
    pub fn with_bounds(table: BrightnessTable, lo: usize, hi: usize) -> LevelTableResult<Self> {
        let len = table.len();
        let fits = match table.last_index() {
            Some(last) => lo <= hi && hi <= last,
            None => lo == 0 && hi == 0,
        };
        if !fits {
            return Err(LevelTableError::InvalidBounds { lo, hi, len });
        }
        Ok(Self { table, lo, hi })
    }

    /// The underlying table.
    #[must_use]
    pub fn table(&self) -> &BrightnessTable {
        &self.table
    }

    /// Lowest valid index.
    #[must_use]
    pub fn lo(&self) -> usize {
        self.lo
    }

    /// Highest valid index.
    #[must_use]
    pub fn hi(&self) -> usize {
        self.hi
    }

    /// Whether the mapper has no usable span.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.lo >= self.hi
    }

    fn span(&self) -> u64 {
        u64::try_from(self.hi.saturating_sub(self.lo)).unwrap_or(0)
    }

    /// Split a normalized level into a table index and the remainder toward the
    /// next index (in units of `1 / SCALE_MAX`).
    ///
    /// `level` is clamped to `SCALE_MAX`, which maps exactly to `(hi, 0)`.
    #[must_use]
    pub fn index_for_level(&self, level: u32) -> (usize, u32) {
        if self.is_degenerate() {
            return (self.lo, 0);
        }
        let scaled = u64::from(level.min(SCALE_MAX)) * self.span();
        let offset = usize::try_from(scaled / SCALE_MAX_U64).unwrap_or(0);
        let index = self.lo.saturating_add(offset).min(self.hi);
        let remainder = u32::try_from(scaled % SCALE_MAX_U64).unwrap_or(0);
        (index, remainder)
    }

    /// Normalized level of a table index, rounded to nearest.
    ///
    /// Indices outside `lo..=hi` are clamped. Returns 0 when degenerate.
    #[must_use]
    pub fn level_for_index(&self, index: usize) -> u32 {
        if self.is_degenerate() {
            return 0;
        }
        let span = self.span();
        let offset = u64::try_from(index.clamp(self.lo, self.hi) - self.lo).unwrap_or(0);
        let level = (offset * SCALE_MAX_U64 + span / 2) / span;
        u32::try_from(level).map_or(SCALE_MAX, |l| l.min(SCALE_MAX))
    }

    /// Normalized level for a raw firmware value.
    ///
    /// Finds the nearest table index and interpolates linearly toward the next
    /// index by the position of `raw` between the two raw neighbors. Neighbors
    /// that are not increasing contribute no interpolation.
    #[must_use]
    pub fn level_for_value(&self, raw: u32) -> u32 {
        if self.is_degenerate() {
            return 0;
        }
        let index = self.table.nearest_index(raw).clamp(self.lo, self.hi);
        let level = self.level_for_index(index);
        if index >= self.hi {
            return level;
        }

        let (Some(here), Some(next)) = (self.table.get(index), self.table.get(index + 1)) else {
            return level;
        };
        if next <= here || raw <= here {
            return level;
        }

        let next_level = self.level_for_index(index + 1);
        let gap = u64::from(next - here);
        let into = u64::from(raw - here).min(gap);
        let step = u64::from(next_level.saturating_sub(level)) * into / gap;
        let interpolated = u64::from(level) + step;
        u32::try_from(interpolated).map_or(SCALE_MAX, |l| l.min(SCALE_MAX))
    }

    /// Raw firmware value for a normalized level.
    ///
    /// Picks `table[index]`. When `extended` is set the remainder of
    /// [`Self::index_for_level`] interpolates toward `table[index + 1]`, which
    /// may lie below the current entry on non-monotonic tables.
    ///
    /// Returns `None` when degenerate.
    #[must_use]
    pub fn raw_for_level(&self, level: u32, extended: bool) -> Option<u32> {
        if self.is_degenerate() {
            return None;
        }
        let (index, remainder) = self.index_for_level(level);
        let raw = self.table.get(index)?;
        if !extended || index >= self.hi {
            return Some(raw);
        }
        let Some(next) = self.table.get(index + 1) else {
            return Some(raw);
        };

        let delta = i64::from(next) - i64::from(raw);
        let adjusted = i64::from(raw) + delta * i64::from(remainder) / i64::from(SCALE_MAX);
        Some(u32::try_from(adjusted.max(0)).unwrap_or(u32::MAX))
    }
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

    fn mapper(raw: &[u32]) -> ScaleMapper {
        ScaleMapper::new(must(BrightnessTable::normalize(raw)))
    }

    #[test]
    fn test_index_for_level_endpoints() {
        let m = mapper(&[5, 95, 10, 20, 30, 40]);
        assert_eq!(m.index_for_level(0), (0, 0));
        assert_eq!(m.index_for_level(SCALE_MAX), (3, 0));
        assert_eq!(m.index_for_level(SCALE_MAX + 500), (3, 0));
    }

    #[test]
    fn test_index_for_level_remainder() {
        let m = mapper(&[5, 95, 10, 20, 30, 40]);
        // 512 * 3 = 1536 = 1 * 1024 + 512
        assert_eq!(m.index_for_level(512), (1, 512));
        // 300 * 3 = 900
        assert_eq!(m.index_for_level(300), (0, 900));
    }

    #[test]
    fn test_level_for_index_rounds_to_nearest() {
        let m = mapper(&[5, 95, 10, 20, 30, 40]);
        assert_eq!(m.level_for_index(0), 0);
        assert_eq!(m.level_for_index(1), 341);
        assert_eq!(m.level_for_index(2), 683);
        assert_eq!(m.level_for_index(3), SCALE_MAX);
        assert_eq!(m.level_for_index(99), SCALE_MAX);
    }

    #[test]
    fn test_level_for_value_interpolates() {
        let m = mapper(&[5, 95, 10, 20, 30, 40]);
        assert_eq!(m.level_for_value(10), 0);
        assert_eq!(m.level_for_value(20), 341);
        // halfway between 20 and 30: 341 + (683 - 341) / 2
        assert_eq!(m.level_for_value(25), 512);
        assert_eq!(m.level_for_value(40), SCALE_MAX);
        assert_eq!(m.level_for_value(4000), SCALE_MAX);
        assert_eq!(m.level_for_value(0), 0);
    }

    #[test]
    fn test_raw_for_level_plain_and_extended() {
        let m = mapper(&[5, 95, 10, 20, 30, 40]);
        assert_eq!(m.raw_for_level(512, false), Some(20));
        // 20 + 10 * 512 / 1024
        assert_eq!(m.raw_for_level(512, true), Some(25));
        assert_eq!(m.raw_for_level(SCALE_MAX, true), Some(40));
        assert_eq!(m.raw_for_level(0, true), Some(10));
    }

    #[test]
    fn test_raw_for_level_on_descending_neighbors() {
        // Reversed table [10, 20, 30, 40, 5, 95]: index 3 -> 4 goes down.
        let m = mapper(&[95, 5, 40, 30, 20, 10]);
        assert_eq!(m.hi(), 5);
        let (index, remainder) = m.index_for_level(700);
        assert_eq!(index, 3);
        assert!(remainder > 0);
        let raw = m.raw_for_level(700, true);
        assert!(matches!(raw, Some(r) if r <= 40 && r >= 5));
    }

    #[test]
    fn test_degenerate_mapper_is_noop() {
        let empty = ScaleMapper::new(BrightnessTable::empty());
        assert!(empty.is_degenerate());
        assert_eq!(empty.index_for_level(700), (0, 0));
        assert_eq!(empty.level_for_index(3), 0);
        assert_eq!(empty.level_for_value(50), 0);
        assert_eq!(empty.raw_for_level(700, true), None);

        let single = mapper(&[1, 2, 3]);
        assert!(single.is_degenerate());
        assert_eq!(single.raw_for_level(SCALE_MAX, false), None);
    }

    #[test]
    fn test_with_bounds_validation() {
        let table = must(BrightnessTable::normalize(&[5, 95, 10, 20, 30, 40]));
        let m = must(ScaleMapper::with_bounds(table.clone(), 1, 3));
        assert_eq!(m.index_for_level(0), (1, 0));
        assert_eq!(m.index_for_level(SCALE_MAX), (3, 0));
        assert_eq!(m.level_for_index(0), 0);

        assert!(matches!(ScaleMapper::with_bounds(table.clone(), 2, 1), Err(_)));
        assert!(matches!(ScaleMapper::with_bounds(table, 0, 4), Err(_)));
        assert!(matches!(ScaleMapper::with_bounds(BrightnessTable::empty(), 0, 0), Ok(_)));
    }
}
