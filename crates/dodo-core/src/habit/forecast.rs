//! Next-occurrence lookup.

use chrono::NaiveDate;

use super::HabitSchedule;
use crate::dates::add_days;

/// How far ahead [`next_applicable`] scans by default.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 730;

/// First day in `start ..= start + max_lookahead_days` on which the habit
/// applies.
///
/// `None` means "no upcoming occurrence" (for example an interval larger
/// than the lookahead); callers must not treat it as an error.
pub fn next_applicable(
    schedule: &HabitSchedule,
    start: NaiveDate,
    max_lookahead_days: u32,
) -> Option<NaiveDate> {
    (0..=u64::from(max_lookahead_days))
        .map(|offset| add_days(start, offset))
        .find(|day| schedule.applies_on(*day))
}
