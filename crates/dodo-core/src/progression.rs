//! Level curve.
//!
//! Level `L` costs `round(200 * 1.35^(L-1))` XP (at least 1) on top of the
//! levels before it. A profile stores only its total XP; everything else is
//! derived here.

use serde::{Deserialize, Serialize};

pub const BASE_LEVEL_XP: f64 = 200.0;
pub const LEVEL_GROWTH: f64 = 1.35;

/// XP needed to clear `level`. Levels below 1 are treated as 1.
pub fn xp_needed_for_level(level: u32) -> u64 {
    let exponent = i32::try_from(level.max(1) - 1).unwrap_or(i32::MAX);
    let raw = (BASE_LEVEL_XP * LEVEL_GROWTH.powi(exponent)).round_ties_even();
    // `as` saturates, which is what we want for absurd levels
    (raw as u64).max(1)
}

/// Position on the level curve for a total XP amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub experience_points: u64,
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_for_next_level: u64,
    pub xp_to_next_level: u64,
}

pub fn progress_from_experience(total_xp: u64) -> Progress {
    let mut level = 1u32;
    let mut remaining = total_xp;
    let mut needed = xp_needed_for_level(level);
    while remaining >= needed {
        remaining -= needed;
        level += 1;
        needed = xp_needed_for_level(level);
    }
    Progress {
        experience_points: total_xp,
        level,
        xp_into_level: remaining,
        xp_for_next_level: needed,
        xp_to_next_level: needed - remaining,
    }
}

/// Apply a signed delta to a total, clamping at zero.
pub fn apply_delta(total_xp: u64, delta: i64) -> Progress {
    let next = if delta.is_negative() {
        total_xp.saturating_sub(delta.unsigned_abs())
    } else {
        total_xp.saturating_add(delta.unsigned_abs())
    };
    progress_from_experience(next)
}
