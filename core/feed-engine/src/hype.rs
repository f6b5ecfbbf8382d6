//! Engagement economy helpers
//!
//! Two small pure rules backing the client's reward loop:
//! - the hype rating regenerates toward its maximum at a constant rate,
//!   computed from the last stored value and its timestamp
//! - progressive-tap milestones fire once per crossed tier

use chrono::{DateTime, Utc};

/// Ceiling for a user's hype rating
pub const HYPE_MAX: f64 = 100.0;

/// Points regained per minute of elapsed time
pub const HYPE_REGEN_PER_MINUTE: f64 = 1.0;

/// Tap-count tiers, ascending
pub const TAP_MILESTONES: [u64; 5] = [10, 50, 100, 500, 1000];

/// A hype rating as last persisted, with lazy regeneration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HypeRating {
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

impl HypeRating {
    pub fn new(value: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            value: value.clamp(0.0, HYPE_MAX),
            updated_at,
        }
    }

    /// Current value after regeneration up to `now`, clamped to the ceiling
    pub fn value_at(&self, now: DateTime<Utc>) -> f64 {
        let elapsed_minutes = (now - self.updated_at).num_seconds().max(0) as f64 / 60.0;
        (self.value + elapsed_minutes * HYPE_REGEN_PER_MINUTE).min(HYPE_MAX)
    }

    /// Spend hype if the regenerated balance covers it
    ///
    /// Returns false without mutating when the balance is short.
    pub fn spend(&mut self, amount: f64, now: DateTime<Utc>) -> bool {
        let current = self.value_at(now);
        if current < amount {
            return false;
        }
        self.value = current - amount;
        self.updated_at = now;
        true
    }
}

/// Highest milestone tier reached for a tap total, if any
pub fn milestone_for(taps: u64) -> Option<u64> {
    TAP_MILESTONES
        .iter()
        .rev()
        .find(|&&threshold| taps >= threshold)
        .copied()
}

/// The milestone newly crossed by moving from `previous` to `current` taps
///
/// Reports each tier exactly once: a tier already reached at `previous` is
/// never reported again.
pub fn newly_crossed(previous: u64, current: u64) -> Option<u64> {
    match (milestone_for(previous), milestone_for(current)) {
        (prev, Some(tier)) if prev != Some(tier) => Some(tier),
        _ => None,
    }
}
