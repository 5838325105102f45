//! Property-based tests for scale mapping invariants.

use acpi_backlight_levels::prelude::*;
use proptest::prelude::*;

/// Firmware list with two reference entries followed by `steps.len()` strictly
/// ascending levels.
fn ascending_raw(start: u32, steps: &[u32], refs: (u32, u32)) -> Vec<u32> {
    let mut raw = vec![refs.0, refs.1];
    let mut level = start;
    for step in steps {
        level = level.saturating_add(*step);
        raw.push(level);
    }
    raw
}

fn mapper_for(raw: &[u32]) -> Result<ScaleMapper, TestCaseError> {
    BrightnessTable::normalize(raw)
        .map(ScaleMapper::new)
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

proptest! {
    #[test]
    fn test_index_round_trip_stays_within_one_bucket(
        start in 0..100u32,
        steps in prop::collection::vec(1..64u32, 2..48),
        value in 0..SCALE_MAX,
    ) {
        let mapper = mapper_for(&ascending_raw(start, &steps, (0, 0)))?;
        let span = u32::try_from(mapper.hi() - mapper.lo())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assume!(span > 0);

        let (index, remainder) = mapper.index_for_level(value);
        prop_assert!(index >= mapper.lo() && index <= mapper.hi());
        prop_assert!(remainder < SCALE_MAX);

        let back = mapper.level_for_index(index);
        // Integer division can leave the value one step above the bucket width.
        let tolerance = SCALE_MAX / span + 1;
        prop_assert!(back.abs_diff(value) <= tolerance,
            "value {} -> index {} -> {} (span {})", value, index, back, span);
    }

    #[test]
    fn test_level_for_value_is_monotonic_and_bounded(
        start in 0..100u32,
        steps in prop::collection::vec(1..64u32, 2..48),
        a in 0..5000u32,
        b in 0..5000u32,
    ) {
        let mapper = mapper_for(&ascending_raw(start, &steps, (0, 0)))?;
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let level_low = mapper.level_for_value(low);
        let level_high = mapper.level_for_value(high);
        prop_assert!(level_high <= SCALE_MAX);
        prop_assert!(level_low <= level_high);
    }

    #[test]
    fn test_level_for_value_hits_table_entries_exactly(
        start in 0..100u32,
        steps in prop::collection::vec(1..64u32, 2..48),
        pick in any::<prop::sample::Index>(),
    ) {
        let mapper = mapper_for(&ascending_raw(start, &steps, (0, 0)))?;
        let index = pick.index(mapper.table().len());
        let raw = mapper.table().get(index).ok_or_else(|| TestCaseError::fail("index"))?;
        prop_assert_eq!(mapper.level_for_value(raw), mapper.level_for_index(index));
    }

    #[test]
    fn test_raw_for_level_stays_inside_table(
        start in 0..100u32,
        steps in prop::collection::vec(1..64u32, 2..48),
        value in 0..=SCALE_MAX,
        extended in any::<bool>(),
    ) {
        let mapper = mapper_for(&ascending_raw(start, &steps, (0, 0)))?;
        let levels = mapper.table().levels();
        let first = levels.first().copied().unwrap_or(0);
        let last = levels.last().copied().unwrap_or(0);

        let raw = mapper.raw_for_level(value, extended)
            .ok_or_else(|| TestCaseError::fail("mapper degenerate"))?;
        prop_assert!(raw >= first && raw <= last);
        if !extended {
            prop_assert!(levels.contains(&raw));
        }
    }

    #[test]
    fn test_reference_indices_never_exceed_reference(
        start in 0..100u32,
        steps in prop::collection::vec(1..64u32, 2..48),
        ac in 0..3000u32,
        bat in 0..3000u32,
    ) {
        let raw = ascending_raw(start, &steps, (ac, bat));
        let table = BrightnessTable::normalize(&raw)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(table.len(), steps.len());

        for (reference, index) in [(ac, table.ac_min_index()), (bat, table.bat_max_index())] {
            let chosen = table.get(index).ok_or_else(|| TestCaseError::fail("index"))?;
            let first = table.get(0).ok_or_else(|| TestCaseError::fail("empty"))?;
            // Either the chosen level fits under the reference, or nothing does.
            prop_assert!(chosen <= reference || (index == 0 && first > reference));
            if let Some(next) = table.get(index + 1) {
                prop_assert!(next > reference);
            }
        }
    }
}
