//! Per-panel brightness state.
//!
//! [`Panel`] owns everything that belongs to one attached backlight: the
//! discovered device, the level mapping, the fade controller, persistence and
//! the published properties. It is single-threaded; the worker in
//! [`crate::worker`] owns it and serializes every call.

use std::time::Instant;

use acpi_backlight_fade::{
    FadeAction, FadeController, FadePhase, FadeState, FadeStep, StepProfileTable,
};
use acpi_backlight_firmware::{BacklightDevice, DeviceCapability};
use acpi_backlight_levels::{BrightnessTable, SCALE_MAX, ScaleMapper};
use acpi_backlight_nvram::PersistenceBridge;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PanelConfig;
use crate::error::{DriverError, DriverResult};
use crate::params::{DisplayParameter, ParameterSet};
use crate::properties::{
    BQC_USE_INDEX, PropertyKey, PropertyMap, RAW_BRIGHTNESS, profile_properties, value_as_bool,
    value_as_u32,
};
use crate::work::{WorkQueue, WorkRequest};

/// A type-checked property write, applied only once the whole batch is valid.
#[derive(Debug, Clone, Copy)]
enum PropertyWrite {
    RawBrightness(u32),
    BqcUseIndex(bool),
    #[cfg(feature = "diagnostics")]
    CycleTest(u32),
    #[cfg(feature = "diagnostics")]
    Klvx(u32),
}

fn integer(key: PropertyKey, value: &Value) -> DriverResult<u32> {
    value_as_u32(value).ok_or_else(|| DriverError::invalid_property(key.to_string(), "an integer"))
}

/// Point-in-time view of a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    /// Path of the control node.
    pub control_path: String,
    /// Path of the backlight node.
    pub backlight_path: String,
    /// Device capability.
    pub capability: DeviceCapability,
    /// Normalized raw levels.
    pub levels: Vec<u32>,
    /// Index nearest the AC-minimum reference level.
    pub ac_min_index: usize,
    /// Index nearest the battery-maximum reference level.
    pub bat_max_index: usize,
    /// Whether requests fade.
    pub smoothing: bool,
    /// Fade phase.
    pub phase: FadePhase,
    /// Fade state.
    pub fade: FadeState,
    /// Whether a display is attached.
    pub display_attached: bool,
    /// Deferred work not yet processed.
    #[serde(with = "crate::work::request_bits")]
    pub pending_work: WorkRequest,
}

/// One attached backlight panel.
#[derive(Debug)]
pub struct Panel {
    device: BacklightDevice,
    mapper: ScaleMapper,
    fade: FadeController,
    bridge: PersistenceBridge,
    work: WorkQueue,
    config: PanelConfig,
    properties: PropertyMap,
    display_attached: bool,
    fade_deadline: Option<Instant>,
}

impl Panel {
    /// Bring up a discovered device.
    ///
    /// Switches the firmware to software control, reads and normalizes the
    /// level table, derives the starting level from the hardware, publishes
    /// the initial properties, then restores a persisted level if the
    /// boot-variable store has one. Firmware failures along the way are logged
    /// and degrade the panel instead of failing the attach.
    pub fn attach(
        device: BacklightDevice,
        bridge: PersistenceBridge,
        work: WorkQueue,
        config: PanelConfig,
    ) -> Self {
        if let Err(e) = device.set_control_mode() {
            tracing::warn!(
                path = %device.control_path(),
                error = %e,
                "Failed to hand brightness control to the OS"
            );
        }

        let table = match device.query_levels() {
            Ok(levels) => BrightnessTable::from_entries_or_empty(levels.iter()),
            Err(e) => {
                tracing::warn!(
                    path = %device.backlight_path(),
                    error = %e,
                    "Failed to read level table, mapping disabled"
                );
                BrightnessTable::empty()
            }
        };

        let smoothing = config.smoothing_enabled && device.capability().smoothing_allowed();
        let fade = FadeController::new(0, config.profiles.clone(), smoothing);
        let mut panel = Self {
            device,
            mapper: ScaleMapper::new(table),
            fade,
            bridge,
            work,
            config,
            properties: PropertyMap::new(),
            display_attached: false,
            fade_deadline: None,
        };

        let raw = panel.query_current_raw();
        let initial = panel.mapper.level_for_value(raw);
        panel.fade = FadeController::new(initial, panel.config.profiles.clone(), smoothing);
        panel.publish_initial_properties(raw);

        tracing::info!(
            control = %panel.device.control_path(),
            backlight = %panel.device.backlight_path(),
            levels = panel.mapper.table().len(),
            extended = panel.device.capability().extended,
            smoothing,
            raw,
            level = initial,
            "Backlight panel attached"
        );

        if let Some(persisted) = panel.bridge.load() {
            let level = u32::from(persisted).min(SCALE_MAX);
            tracing::info!(level, "Restoring persisted brightness");
            panel.fade.set_committed(level);
            panel.request_level(level);
        }

        panel
    }

    fn publish_initial_properties(&mut self, raw: u32) {
        self.properties = profile_properties(self.fade.profiles());
        self.properties
            .insert(BQC_USE_INDEX.to_string(), self.config.bqc_use_index.into());
        self.properties.insert(RAW_BRIGHTNESS.to_string(), raw.into());
        #[cfg(feature = "diagnostics")]
        {
            use crate::properties::{CYCLE_TEST, KLVX};
            self.properties.insert(CYCLE_TEST.to_string(), 1u32.into());
            self.properties.insert(KLVX.to_string(), 1u32.into());
        }
    }

    /// The discovered device.
    #[must_use]
    pub fn device(&self) -> &BacklightDevice {
        &self.device
    }

    /// The level mapping.
    #[must_use]
    pub fn mapper(&self) -> &ScaleMapper {
        &self.mapper
    }

    /// Fade state.
    #[must_use]
    pub fn fade_state(&self) -> FadeState {
        self.fade.state()
    }

    /// When the next fade tick is due, if a fade is running.
    #[must_use]
    pub fn fade_deadline(&self) -> Option<Instant> {
        self.fade_deadline
    }

    /// Current raw level from the firmware, falling back to the AC-minimum
    /// reference level when the query fails.
    pub fn query_current_raw(&self) -> u32 {
        match self.device.query_current_level(self.config.bqc_use_index) {
            Ok(raw) => raw,
            Err(e) => {
                let fallback = self.mapper.table().raw_ac_min();
                tracing::warn!(error = %e, fallback, "Failed to query current level");
                fallback
            }
        }
    }

    /// Map `level` to a raw value and apply it.
    ///
    /// Returns `false` when the firmware call failed. A panel without a level
    /// table ignores the call and returns `true`. On success the published raw
    /// level is refreshed from the hardware.
    pub fn set_brightness_level(&mut self, level: u32) -> bool {
        let extended = self.device.capability().extended;
        let Some(raw) = self.mapper.raw_for_level(level, extended) else {
            tracing::debug!(level, "No level table, brightness request ignored");
            return true;
        };
        match self.device.apply_level(raw) {
            Ok(()) => {
                tracing::debug!(level, raw, "Applied brightness");
                self.refresh_raw_brightness();
                true
            }
            Err(e) => {
                tracing::warn!(level, raw, error = %e, "Failed to apply brightness");
                false
            }
        }
    }

    fn refresh_raw_brightness(&mut self) {
        let raw = self.query_current_raw();
        self.properties.insert(RAW_BRIGHTNESS.to_string(), raw.into());
    }

    /// Request a level in `[0, SCALE_MAX]`; larger values are clamped.
    ///
    /// Fades when the device allows it, otherwise applies immediately. If the
    /// firmware rejects the first write the fade state is left as it was.
    pub fn request_level(&mut self, level: u32) {
        let before = self.fade.state();
        let action = self.fade.request_level(level.min(SCALE_MAX));
        if !self.perform(action) {
            tracing::debug!(level, "Level request abandoned");
            self.fade.restore(before);
        }
    }

    fn perform(&mut self, action: FadeAction) -> bool {
        match action {
            FadeAction::None => true,
            FadeAction::Apply(level) => {
                self.fade_deadline = None;
                self.set_brightness_level(level)
            }
            FadeAction::Step(step) => self.apply_step(step),
        }
    }

    fn apply_step(&mut self, step: FadeStep) -> bool {
        if !self.set_brightness_level(step.level) {
            self.fade_deadline = None;
            return false;
        }
        self.fade_deadline = step
            .rearm
            .and_then(|delay| Instant::now().checked_add(delay));
        true
    }

    /// Run one fade tick. Called by the worker when the deadline passes.
    ///
    /// A rejected step stops the fade at the last level the hardware accepted.
    pub fn on_fade_timer(&mut self) {
        self.fade_deadline = None;
        let before = self.fade.state();
        if let Some(step) = self.fade.tick()
            && !self.apply_step(step)
        {
            tracing::debug!(level = before.current, "Fade stopped");
            self.fade.restore(FadeState {
                target: before.current,
                ..before
            });
        }
    }

    /// Handle an integer display parameter. Always accepted.
    pub fn set_integer_parameter(&mut self, parameter: DisplayParameter, value: u32) -> bool {
        match parameter {
            DisplayParameter::Brightness => self.request_level(value),
            DisplayParameter::Commit => self.commit(),
        }
        true
    }

    /// Handle a parameter by name. Unknown names are declined.
    pub fn set_named_parameter(&mut self, name: &str, value: u32) -> bool {
        match name.parse::<DisplayParameter>() {
            Ok(parameter) => self.set_integer_parameter(parameter, value),
            Err(e) => {
                tracing::debug!(error = %e, "Declined display parameter");
                false
            }
        }
    }

    fn commit(&mut self) {
        let committed = self.fade.commit_target();
        tracing::debug!(committed, "Committed brightness");
        self.work
            .schedule(WorkRequest::PERSIST | WorkRequest::APPLY_BRIGHTNESS);
        if self.device.capability().has_save_method {
            self.save_to_firmware(committed);
        }
    }

    fn save_to_firmware(&self, level: u32) {
        let (index, _) = self.mapper.index_for_level(level);
        let Some(raw) = self.mapper.table().get(index) else {
            return;
        };
        if let Err(e) = self.device.save_level(raw) {
            tracing::warn!(raw, error = %e, "Failed to save level to firmware");
        }
    }

    /// Parameters to publish: `[0, SCALE_MAX]` with the committed value.
    #[must_use]
    pub fn update_parameters(&self) -> ParameterSet {
        ParameterSet::for_committed(self.fade.committed())
    }

    /// A display appeared. A non-zero target becomes the committed level.
    pub fn attach_display(&mut self) -> ParameterSet {
        self.display_attached = true;
        let target = self.fade.state().target;
        if target != 0 {
            self.fade.set_committed(target);
        }
        self.update_parameters()
    }

    /// Drain the deferred-work mask. Returns what was processed.
    pub fn process_pending_work(&mut self) -> WorkRequest {
        let work = self.work.take();
        if work.is_empty() {
            return work;
        }
        let committed = self.fade.committed();
        tracing::trace!(?work, committed, "Processing deferred work");
        if work.contains(WorkRequest::PERSIST) {
            self.bridge.save(committed);
        }
        if work.contains(WorkRequest::APPLY_BRIGHTNESS) && !self.set_brightness_level(committed) {
            tracing::debug!(committed, "Committed level not applied");
        }
        work
    }

    /// Published properties.
    #[must_use]
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Apply property writes.
    ///
    /// Unknown keys are ignored. Every recognized value is type-checked and
    /// the profile edits are validated together before anything is written,
    /// so a rejected batch leaves the panel and the firmware untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidProperty`] for a recognized key with a
    /// value of the wrong type and [`DriverError::Profiles`] when the edited
    /// profile table does not validate.
    pub fn set_properties(&mut self, properties: &PropertyMap) -> DriverResult<()> {
        let mut writes = Vec::new();
        let mut profile_edits = Vec::new();
        for (name, value) in properties {
            let Some(key) = PropertyKey::parse(name) else {
                tracing::debug!(key = %name, "Ignoring unknown property");
                continue;
            };
            let write = match key {
                PropertyKey::RawBrightness => PropertyWrite::RawBrightness(integer(key, value)?),
                PropertyKey::BqcUseIndex => PropertyWrite::BqcUseIndex(
                    value_as_bool(value)
                        .ok_or_else(|| DriverError::invalid_property(key.to_string(), "a boolean"))?,
                ),
                #[cfg(feature = "diagnostics")]
                PropertyKey::CycleTest => PropertyWrite::CycleTest(integer(key, value)?),
                #[cfg(feature = "diagnostics")]
                PropertyKey::Klvx => PropertyWrite::Klvx(integer(key, value)?),
                PropertyKey::SmoothDelta(_)
                | PropertyKey::SmoothStep(_)
                | PropertyKey::SmoothTimeout(_) => {
                    profile_edits.push((key, integer(key, value)?));
                    continue;
                }
            };
            writes.push(write);
        }

        let profiles = if profile_edits.is_empty() {
            None
        } else {
            Some(self.edited_profiles(&profile_edits)?)
        };

        for write in writes {
            self.apply_write(write);
        }
        if let Some(profiles) = profiles {
            self.install_profiles(profiles, &profile_edits);
        }
        Ok(())
    }

    fn apply_write(&mut self, write: PropertyWrite) {
        match write {
            PropertyWrite::RawBrightness(raw) => {
                if let Err(e) = self.device.apply_level(raw) {
                    tracing::warn!(raw, error = %e, "Failed to apply raw brightness");
                }
                self.refresh_raw_brightness();
            }
            PropertyWrite::BqcUseIndex(use_index) => {
                self.config.bqc_use_index = use_index;
                self.properties
                    .insert(BQC_USE_INDEX.to_string(), use_index.into());
            }
            #[cfg(feature = "diagnostics")]
            PropertyWrite::CycleTest(max_raw) => {
                crate::diagnostics::cycle_test(
                    &self.device,
                    max_raw,
                    crate::diagnostics::CyclePacing::default(),
                );
            }
            #[cfg(feature = "diagnostics")]
            PropertyWrite::Klvx(level) => {
                crate::diagnostics::klvx(&self.device, level);
                self.properties
                    .insert(PropertyKey::Klvx.to_string(), level.into());
            }
        }
    }

    fn edited_profiles(&self, edits: &[(PropertyKey, u32)]) -> DriverResult<StepProfileTable> {
        let mut profiles = self.fade.profiles().clone();
        profiles.update(|entries| {
            for &(key, value) in edits {
                match key {
                    PropertyKey::SmoothDelta(i) => {
                        if let Some(profile) = entries.get_mut(i) {
                            profile.delta_threshold = value;
                        }
                    }
                    PropertyKey::SmoothStep(i) => {
                        if let Some(profile) = entries.get_mut(i) {
                            profile.step = value;
                        }
                    }
                    PropertyKey::SmoothTimeout(i) => {
                        if let Some(profile) = entries.get_mut(i) {
                            profile.timeout_micros = value;
                        }
                    }
                    _ => {}
                }
            }
        })?;
        Ok(profiles)
    }

    fn install_profiles(&mut self, profiles: StepProfileTable, edits: &[(PropertyKey, u32)]) {
        let profile_count = profiles.len();
        self.fade.set_profiles(profiles);
        for &(key, value) in edits {
            let index = match key {
                PropertyKey::SmoothDelta(i)
                | PropertyKey::SmoothStep(i)
                | PropertyKey::SmoothTimeout(i) => i,
                _ => continue,
            };
            if index < profile_count {
                self.properties.insert(key.to_string(), value.into());
            } else {
                tracing::debug!(%key, profile_count, "Ignoring edit of a missing profile");
            }
        }
        tracing::debug!(profiles = ?self.fade.profiles(), "Step profiles updated");
    }

    /// Snapshot of the panel.
    #[must_use]
    pub fn snapshot(&self) -> PanelSnapshot {
        let table = self.mapper.table();
        PanelSnapshot {
            control_path: self.device.control_path().to_string(),
            backlight_path: self.device.backlight_path().to_string(),
            capability: self.device.capability(),
            levels: table.levels().to_vec(),
            ac_min_index: table.ac_min_index(),
            bat_max_index: table.bat_max_index(),
            smoothing: self.fade.smoothing(),
            phase: self.fade.phase(),
            fade: self.fade.state(),
            display_attached: self.display_attached,
            pending_work: self.work.pending(),
        }
    }
}
