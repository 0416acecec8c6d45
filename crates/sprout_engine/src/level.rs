//! # Level Engine
//!
//! Pure staircase walk from cumulative experience to (level, progress).
//!
//! Level 1 requires `base` experience to clear; each subsequent level
//! requires `increment` more than the one before - a linear-increasing
//! staircase, not an exponential curve. Thresholds are inclusive: landing
//! exactly on a threshold bumps the level with 0% progress into the next.

use serde::{Deserialize, Serialize};

use sprout_core::LevelCurve;

/// Hard cap on the staircase walk. Keeps the walk finite even under the
/// degenerate `base == 0 && increment == 0` configuration (unsigned curve
/// fields already rule out negative increments).
pub const MAX_LEVEL: u32 = 999;

/// A computed level and the progress toward the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStanding {
    /// Current level, starting at 1.
    pub level: u32,
    /// Percent of the current level's requirement already earned, in
    /// `[0, 100)`. Defined as 100 only when the requirement itself is zero.
    pub progress_percent: u8,
}

/// Computes the level standing for a cumulative experience total.
///
/// Pure and total: negative inputs clamp to zero, and the walk always
/// terminates.
#[must_use]
pub fn calculate_level(cumulative_exp: i64, curve: &LevelCurve) -> LevelStanding {
    let mut remaining = u64::try_from(cumulative_exp).unwrap_or(0);
    let mut level = 1u32;
    let mut requirement = curve.base;

    while requirement > 0 && remaining >= requirement && level < MAX_LEVEL {
        remaining -= requirement;
        level += 1;
        requirement += curve.increment;
    }

    let progress_percent = if requirement == 0 {
        100
    } else {
        // Widened: `remaining` can be near u64::MAX when the MAX_LEVEL cap
        // stopped the walk early. remaining < requirement otherwise, so the
        // value stays below 100 except in that capped case; clamp for it.
        let percent = 100 * u128::from(remaining) / u128::from(requirement);
        u8::try_from(percent.min(99)).unwrap_or(99)
    };

    LevelStanding { level, progress_percent }
}
