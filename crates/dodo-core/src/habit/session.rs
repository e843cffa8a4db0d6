//! Timer sessions used to estimate time actually spent on a habit.
//!
//! There is one session row per (habit, day). Starting opens a segment,
//! pausing folds the segment into `accumulated_seconds`; starting again on a
//! paused row resumes it.
//!
//! ```text
//! (none) --start--> Running --pause--> Paused --start--> Running
//!                      |                                     |
//!                      +------------ complete (closes) ------+
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSession {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub session_on: NaiveDate,
    /// Start of the current (or most recent) segment.
    pub started_at: DateTime<Utc>,
    /// `None` while a segment is running.
    pub ended_at: Option<DateTime<Utc>>,
    pub accumulated_seconds: u64,
}

impl HabitSession {
    pub fn begin(habit_id: &str, user_id: &str, day: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            habit_id: habit_id.to_string(),
            user_id: user_id.to_string(),
            session_on: day,
            started_at: now,
            ended_at: None,
            accumulated_seconds: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Open a new segment. Returns false if one was already running.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running() {
            return false;
        }
        self.started_at = now;
        self.ended_at = None;
        true
    }

    /// Close the running segment. Returns false if nothing was running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.accumulated_seconds += self.segment_seconds(now);
        self.ended_at = Some(now);
        true
    }

    /// Banked seconds plus the running segment, if any.
    pub fn tracked_seconds(&self, now: DateTime<Utc>) -> u64 {
        if self.is_running() {
            self.accumulated_seconds + self.segment_seconds(now)
        } else {
            self.accumulated_seconds
        }
    }

    /// Tracked time rounded to the nearest minute, at least one minute once
    /// anything was tracked.
    pub fn tracked_minutes(&self, now: DateTime<Utc>) -> Option<u32> {
        let seconds = self.tracked_seconds(now);
        if seconds == 0 {
            return None;
        }
        let minutes = ((seconds + 30) / 60).max(1);
        Some(u32::try_from(minutes).unwrap_or(u32::MAX))
    }

    fn segment_seconds(&self, now: DateTime<Utc>) -> u64 {
        // Clock skew can put `now` before `started_at`; count that as zero.
        u64::try_from((now - self.started_at).num_seconds()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn session() -> HabitSession {
        HabitSession::begin("h", "u", at(0, 0, 0).date_naive(), at(9, 0, 0))
    }

    #[test]
    fn pause_banks_running_segment() {
        let mut s = session();
        assert!(s.pause(at(9, 10, 0)));
        assert_eq!(s.accumulated_seconds, 600);
        assert!(!s.is_running());
        assert!(!s.pause(at(9, 20, 0)));
        assert_eq!(s.accumulated_seconds, 600);
    }

    #[test]
    fn resume_accumulates_across_segments() {
        let mut s = session();
        s.pause(at(9, 10, 0));
        assert!(s.resume(at(10, 0, 0)));
        assert!(!s.resume(at(10, 1, 0)));
        assert_eq!(s.tracked_seconds(at(10, 5, 0)), 900);
        s.pause(at(10, 5, 0));
        assert_eq!(s.tracked_minutes(at(12, 0, 0)), Some(15));
    }

    #[test]
    fn minutes_round_and_floor_at_one() {
        let s = session();
        assert_eq!(s.tracked_minutes(at(9, 0, 0)), None);
        assert_eq!(s.tracked_minutes(at(9, 0, 5)), Some(1));
        assert_eq!(s.tracked_minutes(at(9, 2, 29)), Some(2));
        assert_eq!(s.tracked_minutes(at(9, 2, 30)), Some(3));
    }

    #[test]
    fn clock_going_backwards_counts_as_zero() {
        let mut s = session();
        s.pause(at(9, 0, 0) - Duration::minutes(5));
        assert_eq!(s.accumulated_seconds, 0);
    }
}
