//! Experience awards for completing tasks and habits.
//!
//! Awards are integer XP computed from a few quality signals: planned
//! duration, how close the tracked time came to it, punctuality and streak
//! length. Both formulas share the milestone table and the efficiency steps
//! but are tuned separately.
//!
//! Rounding is half-to-even throughout so awards stay stable for planned
//! durations that land exactly on .5.

use serde::{Deserialize, Serialize};

/// Which formula an efficiency bonus is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardKind {
    Task,
    Habit,
}

/// Inputs for [`task_completion_xp`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSignals {
    pub priority: u8,
    pub planned_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
    pub completed_on_time: bool,
    pub completion_streak: u32,
}

/// Inputs for [`habit_completion_xp`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitSignals {
    pub planned_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
    pub completed_on_time: bool,
    pub habit_streak: u32,
}

/// Bonus paid exactly when a streak reaches 3, 7, 14 or 30.
pub fn streak_milestone_bonus(streak: u32) -> i64 {
    match streak {
        3 => 10,
        7 => 25,
        14 => 55,
        30 => 120,
        _ => 0,
    }
}

/// Stepped bonus on actual/planned duration. Finishing under plan pays the
/// most; overrunning by more than 65% costs XP.
pub fn duration_efficiency_bonus(
    planned_minutes: Option<u32>,
    actual_minutes: Option<u32>,
    kind: AwardKind,
) -> i64 {
    let (Some(planned), Some(actual)) = (planned_minutes, actual_minutes) else {
        return 0;
    };
    if planned == 0 || actual == 0 {
        return 0;
    }

    let ratio = f64::from(actual) / f64::from(planned);
    let (habit, task) = if ratio <= 0.85 {
        (18, 14)
    } else if ratio <= 1.0 {
        (14, 10)
    } else if ratio <= 1.15 {
        (10, 7)
    } else if ratio <= 1.35 {
        (4, 2)
    } else if ratio <= 1.65 {
        (0, 0)
    } else {
        (-8, -6)
    };
    match kind {
        AwardKind::Habit => habit,
        AwardKind::Task => task,
    }
}

fn scaled_duration_bonus(planned_minutes: Option<u32>, factor: f64, cap: i64) -> i64 {
    let raw = f64::from(planned_minutes.unwrap_or(0)) * factor;
    (raw.round_ties_even() as i64).min(cap)
}

pub fn task_completion_xp(signals: &TaskSignals) -> i64 {
    let priority_bonus = match signals.priority {
        1 => 6,
        2 => 14,
        3 => 24,
        _ => 10,
    };
    let duration_bonus = scaled_duration_bonus(signals.planned_minutes, 0.25, 40);
    let efficiency_bonus = duration_efficiency_bonus(
        signals.planned_minutes,
        signals.actual_minutes,
        AwardKind::Task,
    );
    let on_time_bonus = if signals.completed_on_time { 16 } else { 0 };
    let streak_bonus = streak_milestone_bonus(signals.completion_streak);

    let total = 35 + priority_bonus + duration_bonus + efficiency_bonus + on_time_bonus + streak_bonus;
    total.max(10)
}

pub fn habit_completion_xp(signals: &HabitSignals) -> i64 {
    let duration_bonus = scaled_duration_bonus(signals.planned_minutes, 0.35, 60);
    let efficiency_bonus = duration_efficiency_bonus(
        signals.planned_minutes,
        signals.actual_minutes,
        AwardKind::Habit,
    );
    let on_time_bonus = if signals.completed_on_time { 24 } else { 8 };
    let streak_bonus = streak_milestone_bonus(signals.habit_streak);
    // floor(streak * 1.5) capped at 25
    let consistency_bonus = (i64::from(signals.habit_streak) * 3 / 2).min(25);

    let total = 55 + duration_bonus + efficiency_bonus + on_time_bonus + streak_bonus + consistency_bonus;
    total.max(18)
}
