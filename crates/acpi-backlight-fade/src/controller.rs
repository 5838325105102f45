//! Fade state machine.
//!
//! The controller never sleeps or calls firmware itself. Every operation returns
//! a [`FadeAction`] or [`FadeStep`] telling the owner which level to apply and
//! whether to arm the next tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::profile::{DEFAULT_PROFILES, StepProfileTable};

/// Snapshot of the fade state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FadeState {
    /// Level most recently applied to the hardware.
    pub current: u32,
    /// Level the fade is heading toward.
    pub target: u32,
    /// Level last committed by the OS, which is what gets persisted.
    pub committed: u32,
    /// Active row of the step profile table.
    pub profile_index: usize,
}

/// Fade phase derived from [`FadeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FadePhase {
    /// `current == target`, no tick pending.
    Idle,
    /// Moving toward `target`.
    Fading,
}

/// Result of one fade tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeStep {
    /// Level to apply now.
    pub level: u32,
    /// Delay before the next tick, `None` once the target is reached.
    pub rearm: Option<Duration>,
}

impl FadeStep {
    /// Whether this step reached the target.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.rearm.is_none()
    }
}

/// What the owner must do after a level request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeAction {
    /// Nothing to do; a fade already in progress absorbs the request.
    None,
    /// Apply this level immediately, no timer involved.
    Apply(u32),
    /// A fade started: apply the first step and arm the timer if requested.
    Step(FadeStep),
}

/// Adaptive fade controller for one panel.
#[derive(Debug, Clone)]
pub struct FadeController {
    state: FadeState,
    profiles: StepProfileTable,
    smoothing: bool,
}

impl FadeController {
    /// Create an idle controller at `initial`.
    ///
    /// `smoothing` is false when the device cannot fade (no timer, not an
    /// extended device, or firmware options disable it).
    #[must_use]
    pub fn new(initial: u32, profiles: StepProfileTable, smoothing: bool) -> Self {
        Self {
            state: FadeState {
                current: initial,
                target: initial,
                committed: initial,
                profile_index: 0,
            },
            profiles,
            smoothing,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FadeState {
        self.state
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FadePhase {
        if self.state.current == self.state.target {
            FadePhase::Idle
        } else {
            FadePhase::Fading
        }
    }

    /// Whether requests animate or apply immediately.
    #[must_use]
    pub fn smoothing(&self) -> bool {
        self.smoothing
    }

    /// Active step profiles.
    #[must_use]
    pub fn profiles(&self) -> &StepProfileTable {
        &self.profiles
    }

    /// Mutable access to the profiles, for validated edits.
    pub fn profiles_mut(&mut self) -> &mut StepProfileTable {
        &mut self.profiles
    }

    /// Replace the profile table. The active index is clamped to the new table.
    pub fn set_profiles(&mut self, profiles: StepProfileTable) {
        self.profiles = profiles;
        self.clamp_profile_index();
    }

    fn clamp_profile_index(&mut self) {
        self.state.profile_index = self.state.profile_index.min(self.profiles.last_index());
    }

    /// Last committed level.
    #[must_use]
    pub fn committed(&self) -> u32 {
        self.state.committed
    }

    /// Record the committed level without changing the fade.
    pub fn set_committed(&mut self, level: u32) {
        self.state.committed = level;
    }

    /// Put back a state taken with [`Self::state`], dropping whatever changed
    /// since. Used when the firmware rejects a level the controller already
    /// moved to.
    pub fn restore(&mut self, state: FadeState) {
        self.state = state;
        self.clamp_profile_index();
    }

    /// Commit the current target.
    pub fn commit_target(&mut self) -> u32 {
        self.state.committed = self.state.target;
        self.state.committed
    }

    /// Request a new level.
    pub fn request_level(&mut self, level: u32) -> FadeAction {
        if !self.smoothing {
            self.state.current = level;
            self.state.target = level;
            return FadeAction::Apply(level);
        }

        if level == self.state.target {
            return match self.phase() {
                // A redundant request still writes the hardware once.
                FadePhase::Idle => FadeAction::Apply(self.state.current),
                FadePhase::Fading => FadeAction::None,
            };
        }

        let distance = level.abs_diff(self.state.current);
        self.state.profile_index = self.profiles.select(distance);
        let was_idle = self.phase() == FadePhase::Idle;
        self.state.target = level;

        tracing::trace!(
            from = self.state.current,
            to = level,
            profile = self.state.profile_index,
            "Fade requested"
        );

        if !was_idle {
            return FadeAction::None;
        }
        match self.tick() {
            Some(step) => FadeAction::Step(step),
            None => FadeAction::None,
        }
    }

    /// Advance the fade by one step. Returns `None` when idle.
    pub fn tick(&mut self) -> Option<FadeStep> {
        if self.phase() == FadePhase::Idle {
            return None;
        }
        self.clamp_profile_index();

        let distance = self.state.target.abs_diff(self.state.current);
        if let Some(finer_index) = self.state.profile_index.checked_sub(1)
            && self
                .profiles
                .get(finer_index)
                .is_some_and(|finer| distance <= finer.delta_threshold)
        {
            self.state.profile_index = finer_index;
        }

        let profile = self
            .profiles
            .get(self.state.profile_index)
            .copied()
            .unwrap_or(DEFAULT_PROFILES[0]);

        let step = profile.step.max(1);
        let target = self.state.target;
        self.state.current = if target > self.state.current {
            self.state.current.saturating_add(step).min(target)
        } else {
            self.state.current.saturating_sub(step).max(target)
        };

        let rearm = (self.state.current != target).then(|| profile.timeout());
        Some(FadeStep {
            level: self.state.current,
            rearm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StepProfile;

    fn must<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    fn run_to_idle(controller: &mut FadeController, first: FadeAction) -> Vec<u32> {
        let mut applied = Vec::new();
        let mut next = match first {
            FadeAction::Step(step) => {
                applied.push(step.level);
                step.rearm
            }
            FadeAction::Apply(level) => {
                applied.push(level);
                None
            }
            FadeAction::None => None,
        };
        while next.is_some() {
            match controller.tick() {
                Some(step) => {
                    applied.push(step.level);
                    next = step.rearm;
                }
                None => next = None,
            }
        }
        applied
    }

    #[test]
    fn test_without_smoothing_applies_immediately() {
        let mut c = FadeController::new(100, StepProfileTable::default(), false);
        assert_eq!(c.request_level(900), FadeAction::Apply(900));
        assert_eq!(c.state().current, 900);
        assert_eq!(c.phase(), FadePhase::Idle);
    }

    #[test]
    fn test_redundant_request_while_idle_applies_once() {
        let mut c = FadeController::new(300, StepProfileTable::default(), true);
        assert_eq!(c.request_level(300), FadeAction::Apply(300));
        assert_eq!(c.phase(), FadePhase::Idle);
    }

    #[test]
    fn test_fade_starts_with_synchronous_tick() {
        let mut c = FadeController::new(0, StepProfileTable::default(), true);
        let action = c.request_level(100);
        assert_eq!(
            action,
            FadeAction::Step(FadeStep {
                level: 16,
                rearm: Some(Duration::from_millis(10)),
            })
        );
        assert_eq!(c.phase(), FadePhase::Fading);
        assert_eq!(c.state().profile_index, 2);
    }

    #[test]
    fn test_request_during_fade_retargets_without_tick() {
        let mut c = FadeController::new(0, StepProfileTable::default(), true);
        let _first = c.request_level(500);
        assert_eq!(c.request_level(500), FadeAction::None);
        assert_eq!(c.request_level(200), FadeAction::None);
        assert_eq!(c.state().target, 200);
        assert_eq!(c.state().current, 16);
    }

    #[test]
    fn test_profile_index_steps_down_near_target() {
        let mut c = FadeController::new(0, StepProfileTable::default(), true);
        let first = c.request_level(100);
        let applied = run_to_idle(&mut c, first);

        assert_eq!(applied.last(), Some(&100));
        assert_eq!(c.phase(), FadePhase::Idle);
        assert_eq!(c.state().profile_index, 0);
        // 16,32,48 with step 16; distance 52 drops to step 4 ... then step 1.
        assert_eq!(applied.first(), Some(&16));
        assert!(applied.windows(2).all(|w| matches!(w, [a, b] if a < b)));
    }

    #[test]
    fn test_fade_down() {
        let mut c = FadeController::new(1024, StepProfileTable::default(), true);
        let first = c.request_level(0);
        let applied = run_to_idle(&mut c, first);
        assert_eq!(applied.last(), Some(&0));
        assert!(applied.windows(2).all(|w| matches!(w, [a, b] if a > b)));
    }

    #[test]
    fn test_tick_when_idle_is_none() {
        let mut c = FadeController::new(50, StepProfileTable::default(), true);
        assert_eq!(c.tick(), None);
    }

    #[test]
    fn test_set_profiles_clamps_index() {
        let mut c = FadeController::new(0, StepProfileTable::default(), true);
        let _first = c.request_level(1000);
        assert_eq!(c.state().profile_index, 2);

        let single = must(StepProfileTable::new(vec![StepProfile::new(5, 2, 100)]));
        c.set_profiles(single);
        assert_eq!(c.state().profile_index, 0);
        let step = c.tick();
        assert_eq!(step.map(|s| s.level), Some(18));
        assert_eq!(
            step.and_then(|s| s.rearm),
            Some(Duration::from_micros(100))
        );
    }

    #[test]
    fn test_restore_undoes_request() {
        let mut c = FadeController::new(200, StepProfileTable::default(), false);
        let before = c.state();
        assert_eq!(c.request_level(900), FadeAction::Apply(900));
        c.restore(before);
        assert_eq!(c.state(), before);
        assert_eq!(c.phase(), FadePhase::Idle);

        let mut c = FadeController::new(0, StepProfileTable::default(), true);
        let before = c.state();
        let _first = c.request_level(1000);
        assert_eq!(c.phase(), FadePhase::Fading);
        c.restore(before);
        assert_eq!(c.state().current, 0);
        assert_eq!(c.state().target, 0);
        assert_eq!(c.tick(), None);
    }

    #[test]
    fn test_commit_target() {
        let mut c = FadeController::new(10, StepProfileTable::default(), true);
        let _first = c.request_level(400);
        assert_eq!(c.commit_target(), 400);
        assert_eq!(c.committed(), 400);
        c.set_committed(12);
        assert_eq!(c.state().committed, 12);
    }
}
