//! Mastery streak tracking.
//!
//! A slot is mastered after `target` consecutive passing submissions. Any
//! failure resets the run to zero. Mastery is terminal for the slot; the next
//! slot starts from a fresh [`StreakState`].

use serde::{Deserialize, Serialize};

/// Default number of consecutive passes needed for mastery.
pub const DEFAULT_STREAK_TARGET: u32 = 3;

/// Default minimum score that counts as a pass.
pub const DEFAULT_PASS_THRESHOLD: u8 = 80;

/// What counts as a pass, and how many in a row are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    pub target: u32,
    pub pass_threshold: u8,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            target: DEFAULT_STREAK_TARGET,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }
}

/// Consecutive-pass counter for one exercise slot.
///
/// Invariant: `mastered() == (consecutive_passes() >= target())`. Fields are
/// private so only [`StreakState::record`] can move the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakState {
    consecutive_passes: u32,
    target: u32,
    mastered: bool,
}

impl StreakState {
    /// A fresh streak. A target of zero is raised to one.
    pub fn new(target: u32) -> Self {
        Self {
            consecutive_passes: 0,
            target: target.max(1),
            mastered: false,
        }
    }

    /// The transition: a pass extends the run, a failure resets it.
    #[must_use]
    pub fn record(self, passed: bool) -> Self {
        let consecutive_passes = if passed {
            self.consecutive_passes.saturating_add(1)
        } else {
            0
        };
        Self {
            consecutive_passes,
            target: self.target,
            mastered: consecutive_passes >= self.target,
        }
    }

    /// Feed a score through the policy's pass threshold.
    #[must_use]
    pub fn record_score(self, score: u8, pass_threshold: u8) -> Self {
        self.record(score >= pass_threshold)
    }

    pub fn consecutive_passes(&self) -> u32 {
        self.consecutive_passes
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn mastered(&self) -> bool {
        self.mastered
    }

    /// Passes still needed before mastery.
    pub fn remaining(&self) -> u32 {
        self.target.saturating_sub(self.consecutive_passes)
    }
}

impl Default for StreakState {
    fn default() -> Self {
        Self::new(DEFAULT_STREAK_TARGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_fail_sequence() {
        let mut state = StreakState::new(3);
        let mut history = Vec::new();
        for passed in [true, true, false, true, true, true] {
            state = state.record(passed);
            history.push(state);
        }

        assert!(!history[0].mastered());
        assert!(!history[1].mastered());
        assert_eq!(history[1].consecutive_passes(), 2);
        assert_eq!(history[2].consecutive_passes(), 0);
        assert!(!history[2].mastered());
        assert!(!history[4].mastered());
        assert!(history[5].mastered());
        assert_eq!(history[5].consecutive_passes(), 3);
    }

    #[test]
    fn failure_clears_mastery() {
        let state = StreakState::new(1).record(true);
        assert!(state.mastered());
        let state = state.record(false);
        assert!(!state.mastered());
        assert_eq!(state.consecutive_passes(), 0);
    }

    #[test]
    fn passes_beyond_target_stay_mastered() {
        let state = StreakState::new(2).record(true).record(true).record(true);
        assert!(state.mastered());
        assert_eq!(state.consecutive_passes(), 3);
        assert_eq!(state.remaining(), 0);
    }

    #[test]
    fn record_score_uses_threshold() {
        let state = StreakState::new(3).record_score(80, 80);
        assert_eq!(state.consecutive_passes(), 1);
        let state = state.record_score(79, 80);
        assert_eq!(state.consecutive_passes(), 0);
    }

    #[test]
    fn zero_target_is_raised() {
        let state = StreakState::new(0);
        assert_eq!(state.target(), 1);
        assert!(!state.mastered());
    }

    #[test]
    fn defaults() {
        let policy = StreakPolicy::default();
        assert_eq!(policy.target, 3);
        assert_eq!(policy.pass_threshold, 80);
        assert_eq!(StreakState::default().remaining(), 3);
    }
}
