//! "Does this habit apply on day D?"
//!
//! Evaluation is a pure function of the recurrence rule, the anchor date and
//! the day. It runs once per day inside streak reconstruction, so it must not
//! allocate or touch storage.

use chrono::NaiveDate;

use super::{Habit, Recurrence};
use crate::dates::{days_between, weekday_sun_first};

/// The part of a habit that decides which days it is due on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitSchedule {
    pub recurrence: Recurrence,
    pub anchor: NaiveDate,
}

impl HabitSchedule {
    pub fn new(recurrence: Recurrence, anchor: NaiveDate) -> Self {
        Self { recurrence, anchor }
    }

    pub fn applies_on(&self, day: NaiveDate) -> bool {
        if day < self.anchor {
            return false;
        }
        match self.recurrence {
            Recurrence::Daily => true,
            Recurrence::Interval { days: 0 } => false,
            Recurrence::Interval { days } => {
                days_between(self.anchor, day) % i64::from(days) == 0
            }
            Recurrence::CustomDays(set) => set.contains(weekday_sun_first(day)),
        }
    }
}

/// Convenience over [`HabitSchedule::applies_on`] for a full habit snapshot.
pub fn applies(habit: &Habit, day: NaiveDate) -> bool {
    habit.schedule().applies_on(day)
}
