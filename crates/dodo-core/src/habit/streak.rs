//! Streak reconstruction from the full completion history.
//!
//! Streaks are never incremented in place. Every write recomputes them from
//! the set of completed days, which makes the derived fields self-healing
//! after an edit to the recurrence rule or an out-of-order completion.
//!
//! ## Algorithm
//!
//! ```text
//! forward:  earliest ..= max(today, latest completion)
//!           not applicable        -> skip
//!           applicable, completed -> run += 1, best = max(best, run), last = day
//!           applicable, missed    -> run = 0
//! backward: from `last`, count completed applicable days, stepping over
//!           days the rule skips; stop at the first missed applicable day
//! ```
//!
//! `best` comes from the forward pass and `current` from the backward pass.
//! When a completion is dated after today the forward run that reaches
//! `evaluation_end` may not be the tail ending at `last`, so the two are kept
//! separate.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::forecast::next_applicable;
use super::HabitSchedule;
use crate::dates::DayRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
    pub last_completed: Option<NaiveDate>,
}

/// Everything cached on a habit row that is derived from its history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedState {
    pub streak: StreakSummary,
    pub next_occurrence_on: Option<NaiveDate>,
}

impl DerivedState {
    pub fn compute(
        schedule: &HabitSchedule,
        completed: &BTreeSet<NaiveDate>,
        today: NaiveDate,
        max_lookahead_days: u32,
    ) -> Self {
        Self {
            streak: recompute(schedule, completed, today),
            next_occurrence_on: next_applicable(schedule, today, max_lookahead_days),
        }
    }
}

/// Recompute current streak, best streak and the last completed applicable
/// day.
///
/// Completions on days the rule does not cover are tolerated (they may
/// predate a rule edit) but never extend a streak.
pub fn recompute(
    schedule: &HabitSchedule,
    completed: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> StreakSummary {
    let (Some(&earliest), Some(&latest)) = (completed.first(), completed.last()) else {
        return StreakSummary::default();
    };
    let evaluation_end = today.max(latest);

    let mut run = 0u32;
    let mut best = 0u32;
    let mut last_completed = None;
    for day in DayRange::inclusive(earliest, evaluation_end) {
        if !schedule.applies_on(day) {
            continue;
        }
        if completed.contains(&day) {
            run += 1;
            best = best.max(run);
            last_completed = Some(day);
        } else {
            run = 0;
        }
    }

    let current = last_completed
        .map(|last| tail_length(schedule, completed, earliest, last))
        .unwrap_or(0);

    StreakSummary {
        current,
        best,
        last_completed,
    }
}

fn tail_length(
    schedule: &HabitSchedule,
    completed: &BTreeSet<NaiveDate>,
    earliest: NaiveDate,
    last: NaiveDate,
) -> u32 {
    let mut count = 0u32;
    let mut cursor = Some(last);
    while let Some(day) = cursor.filter(|d| *d >= earliest) {
        if schedule.applies_on(day) {
            if !completed.contains(&day) {
                break;
            }
            count += 1;
        }
        cursor = day.pred_opt();
    }
    count
}
