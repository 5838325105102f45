//! Command implementations for backlightctl

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use acpi_backlight_driver::properties::RAW_BRIGHTNESS;
use acpi_backlight_driver::{BacklightDriver, PanelConfig, PanelSnapshot, PropertyMap};
use acpi_backlight_fade::{FadeAction, FadeController, FadeState, FadeStep};
use acpi_backlight_firmware::{BacklightDevice, FirmwareMethod, discover};
use acpi_backlight_levels::{BrightnessTable, SCALE_MAX, ScaleMapper};
use acpi_backlight_nvram::{FileStoreLocator, MemoryStore, StaticLocator, StoreLocator};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;
use crate::fixture::FirmwareTree;

/// Upper bound on waiting for a fade to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a command needs: the firmware tree, driver configuration and
/// the optional boot-variable file.
#[derive(Debug)]
pub struct Context {
    pub tree: FirmwareTree,
    pub config: PanelConfig,
    pub nvram: Option<PathBuf>,
}

impl Context {
    pub fn load(
        fixture: Option<&Path>,
        config: Option<&Path>,
        nvram: Option<&Path>,
    ) -> Result<Self, CliError> {
        let tree = FirmwareTree::load(fixture)?;
        let config = match config {
            Some(path) => PanelConfig::load(path)?,
            None => PanelConfig::default(),
        };
        if let Some(path) = nvram
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(CliError::ValidationError(format!(
                "nvram directory {} does not exist",
                parent.display()
            )));
        }
        Ok(Self {
            tree,
            config,
            nvram: nvram.map(Path::to_path_buf),
        })
    }

    fn locator(&self) -> Arc<dyn StoreLocator> {
        match &self.nvram {
            Some(path) => Arc::new(FileStoreLocator::new(path)),
            None => Arc::new(StaticLocator::new(Arc::new(MemoryStore::new()))),
        }
    }

    fn attach(&self) -> Result<BacklightDriver, CliError> {
        let driver = BacklightDriver::attach(
            &self.tree.provider,
            &self.tree.root,
            self.locator(),
            self.config.clone(),
        )?;
        Ok(driver)
    }

    fn discover(&self) -> Result<(BacklightDevice, Vec<u32>), CliError> {
        let device = discover(&self.tree.provider, &self.tree.root)?;
        let raw = device
            .query_levels()?
            .iter()
            .map(|value| value.as_u32(FirmwareMethod::QueryLevels))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((device, raw))
    }
}

fn check_level(value: u32) -> Result<u32, CliError> {
    if value > SCALE_MAX {
        return Err(CliError::ValidationError(format!(
            "level {value} is outside [0, {SCALE_MAX}]"
        )));
    }
    Ok(value)
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub control_path: String,
    pub backlight_path: String,
    pub extended: bool,
    pub raw: Vec<u32>,
    pub levels: Vec<u32>,
    pub ac_min_index: usize,
    pub bat_max_index: usize,
    pub raw_ac_min: u32,
    pub raw_bat_max: u32,
}

/// Normalized level table of the discovered panel.
pub fn table(ctx: &Context) -> Result<TableReport, CliError> {
    let (device, raw) = ctx.discover()?;
    let table = BrightnessTable::from_entries(raw.iter().copied())?;
    Ok(TableReport {
        control_path: device.control_path().to_string(),
        backlight_path: device.backlight_path().to_string(),
        extended: device.capability().extended,
        levels: table.levels().to_vec(),
        ac_min_index: table.ac_min_index(),
        bat_max_index: table.bat_max_index(),
        raw_ac_min: table.raw_ac_min(),
        raw_bat_max: table.raw_bat_max(),
        raw,
    })
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MappingReport {
    pub level: u32,
    pub index: usize,
    pub remainder: u32,
    pub raw: Option<u32>,
    pub extended: bool,
}

/// Where a normalized level lands in the table.
pub fn map(ctx: &Context, value: u32) -> Result<MappingReport, CliError> {
    let level = check_level(value)?;
    let (device, raw) = ctx.discover()?;
    let extended = device.capability().extended;
    let mapper = ScaleMapper::new(BrightnessTable::from_entries(raw.iter().copied())?);
    let (index, remainder) = mapper.index_for_level(level);
    Ok(MappingReport {
        level,
        index,
        remainder,
        raw: mapper.raw_for_level(level, extended),
        extended,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SetReport {
    pub requested: u32,
    pub committed: bool,
    pub fade: FadeState,
    pub raw: Option<u64>,
    pub writes: Vec<u32>,
}

/// Request a level through the driver and wait for any fade to finish.
pub fn set(ctx: &Context, value: u32, commit: bool) -> Result<SetReport, CliError> {
    let level = check_level(value)?;
    let driver = ctx.attach()?;
    let panel = ctx.tree.node(&driver.snapshot()?.backlight_path)?;
    panel.clear_history();

    driver.set_brightness(level)?;
    if commit {
        driver.commit()?;
    }
    driver.wait_idle(SETTLE_TIMEOUT)?;
    let raw = driver
        .properties()?
        .get(RAW_BRIGHTNESS)
        .and_then(Value::as_u64);
    let snapshot = driver.detach()?;

    Ok(SetReport {
        requested: level,
        committed: commit,
        fade: snapshot.fade,
        raw,
        writes: panel.writes(),
    })
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TraceStep {
    pub tick: usize,
    pub at_us: u64,
    pub level: u32,
    pub raw: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FadeTrace {
    pub from: u32,
    pub to: u32,
    pub smoothing: bool,
    pub steps: Vec<TraceStep>,
}

impl FadeTrace {
    /// Simulated time from the first to the last step.
    pub fn duration_us(&self) -> u64 {
        self.steps.last().map_or(0, |step| step.at_us)
    }
}

/// Simulate a fade without touching the firmware, one entry per tick.
pub fn fade(ctx: &Context, from: u32, to: u32) -> Result<FadeTrace, CliError> {
    let from = check_level(from)?;
    let to = check_level(to)?;
    let (device, raw) = ctx.discover()?;
    let capability = device.capability();
    let mapper = ScaleMapper::new(BrightnessTable::from_entries(raw.iter().copied())?);
    let smoothing = ctx.config.smoothing_enabled && capability.smoothing_allowed();

    let mut controller = FadeController::new(from, ctx.config.profiles.clone(), smoothing);
    let mut next = match controller.request_level(to) {
        FadeAction::None => None,
        FadeAction::Apply(level) => Some(FadeStep { level, rearm: None }),
        FadeAction::Step(step) => Some(step),
    };

    let mut steps = Vec::new();
    let mut elapsed = Duration::ZERO;
    while let Some(step) = next {
        steps.push(TraceStep {
            tick: steps.len(),
            at_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            level: step.level,
            raw: mapper.raw_for_level(step.level, capability.extended),
        });
        next = match step.rearm {
            Some(delay) => {
                elapsed = elapsed.saturating_add(delay);
                controller.tick()
            }
            None => None,
        };
    }
    tracing::debug!(from, to, ticks = steps.len(), "Simulated fade");

    Ok(FadeTrace {
        from,
        to,
        smoothing,
        steps,
    })
}

/// Parse `KEY=VALUE`. The value is read as JSON, falling back to a string.
pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing property name in `{s}`"));
    }
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| Value::String(value.trim().to_string()));
    Ok((key.to_string(), value))
}

/// Published properties, after applying `assignments` if any.
pub fn props(ctx: &Context, assignments: &[(String, Value)]) -> Result<PropertyMap, CliError> {
    let driver = ctx.attach()?;
    if !assignments.is_empty() {
        let properties: PropertyMap = assignments.iter().cloned().collect();
        driver.set_properties(properties)?;
    }
    let properties = driver.properties()?;
    driver.detach()?;
    Ok(properties)
}

/// Attach, report the panel state and detach.
pub fn status(ctx: &Context) -> Result<PanelSnapshot, CliError> {
    let driver = ctx.attach()?;
    Ok(driver.detach()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn default_context() -> Result<Context, CliError> {
        Context::load(None, None, None)
    }

    #[test]
    fn test_table_of_default_panel() -> TestResult {
        let report = table(&default_context()?)?;
        assert_eq!(report.backlight_path, "_SB.PCI0.GFX0.DD02");
        assert_eq!(report.control_path, "_SB.PCI0.GFX0");
        assert!(report.extended);
        assert_eq!(report.raw.len(), 19);
        assert_eq!(report.levels.len(), 17);
        assert_eq!(report.ac_min_index, 8);
        assert_eq!(report.bat_max_index, 16);
        assert_eq!(report.raw_ac_min, 896);
        assert_eq!(report.raw_bat_max, 1792);
        Ok(())
    }

    #[test]
    fn test_map_interpolates_on_extended_panel() -> TestResult {
        let ctx = default_context()?;
        let middle = map(&ctx, 512)?;
        assert_eq!((middle.index, middle.remainder, middle.raw), (8, 0, Some(896)));

        let low = map(&ctx, 100)?;
        assert_eq!(low.index, 1);
        assert_eq!(low.remainder, 576);
        assert_eq!(low.raw, Some(175));

        let top = map(&ctx, SCALE_MAX)?;
        assert_eq!((top.index, top.raw), (16, Some(1792)));
        Ok(())
    }

    #[test]
    fn test_out_of_scale_level_rejected() -> TestResult {
        let ctx = default_context()?;
        assert!(matches!(map(&ctx, 1025), Err(CliError::ValidationError(_))));
        assert!(matches!(fade(&ctx, 0, 5000), Err(CliError::ValidationError(_))));
        Ok(())
    }

    #[test]
    fn test_fade_trace_is_monotone_and_ends_at_target() -> TestResult {
        let trace = fade(&default_context()?, 0, SCALE_MAX)?;
        assert!(trace.smoothing);
        assert!(trace.steps.len() > 10);
        assert!(
            trace
                .steps
                .windows(2)
                .all(|pair| matches!(pair, [a, b] if a.level < b.level && a.at_us < b.at_us))
        );
        assert!(matches!(trace.steps.last(), Some(step) if step.level == SCALE_MAX));
        assert!(matches!(trace.steps.first(), Some(step) if step.at_us == 0));
        assert!(trace.duration_us() > 0);
        Ok(())
    }

    #[test]
    fn test_fade_without_smoothing_is_one_step() -> TestResult {
        let mut ctx = default_context()?;
        ctx.config.smoothing_enabled = false;
        let trace = fade(&ctx, 0, 700)?;
        assert!(!trace.smoothing);
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.duration_us(), 0);
        Ok(())
    }

    #[test]
    fn test_set_fades_to_requested_level() -> TestResult {
        let report = set(&default_context()?, SCALE_MAX, true)?;
        assert_eq!(report.fade.current, SCALE_MAX);
        assert_eq!(report.fade.committed, SCALE_MAX);
        assert_eq!(report.raw, Some(1792));
        assert!(report.writes.len() > 1);
        assert_eq!(report.writes.last(), Some(&1792));
        Ok(())
    }

    #[test]
    fn test_props_applies_assignments() -> TestResult {
        let ctx = default_context()?;
        let assignments = vec![parse_assignment("SmoothStep2=32")?];
        let published = props(&ctx, &assignments)?;
        assert_eq!(published.get("SmoothStep2"), Some(&json!(32)));

        let bad = vec![parse_assignment("SmoothStep0=0")?];
        assert!(matches!(props(&ctx, &bad), Err(CliError::Driver(_))));
        Ok(())
    }

    #[test]
    fn test_parse_assignment() -> TestResult {
        assert_eq!(parse_assignment("RawBrightness=40")?, ("RawBrightness".to_string(), json!(40)));
        assert_eq!(
            parse_assignment("BQC use index=true")?,
            ("BQC use index".to_string(), json!(true))
        );
        assert_eq!(parse_assignment("Name=abc")?, ("Name".to_string(), json!("abc")));
        assert!(matches!(parse_assignment("novalue"), Err(_)));
        assert!(matches!(parse_assignment("=3"), Err(_)));
        Ok(())
    }

    #[test]
    fn test_missing_nvram_directory_rejected() {
        let result = Context::load(None, None, Some(Path::new("/nonexistent-backlightctl/nv.json")));
        assert!(matches!(result, Err(CliError::ValidationError(_))));
    }
}
