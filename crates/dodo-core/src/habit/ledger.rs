//! Completion ledger.
//!
//! Records and removes habit completions, drives the per-day timer session,
//! and keeps the derived habit fields and profile XP in step. Each write
//! operation runs in a single `IMMEDIATE` transaction, so two concurrent
//! completions of the same day cannot both award XP.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::{DerivedState, Habit, HabitCompletion, HabitSession, DEFAULT_LOOKAHEAD_DAYS};
use crate::dates::{parse_date, today_utc};
use crate::error::{CoreError, Result, ValidationError};
use crate::progression::Progress;
use crate::scoring::{habit_completion_xp, HabitSignals};
use crate::storage::{habits as store, profile, Database};

pub const HISTORY_DEFAULT_DAYS: u32 = 7;
pub const HISTORY_MAX_DAYS: u32 = 180;

/// Result of `complete` / `uncomplete`.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub habit: Habit,
    pub date: NaiveDate,
    pub completed: bool,
    /// XP applied to the profile by this call (0 for a re-completion).
    pub xp_delta: i64,
    /// Profile progress after the delta, when XP moved.
    pub progress: Option<Progress>,
    pub session: Option<HabitSession>,
}

/// Result of `start_timer` / `pause_timer`.
#[derive(Debug, Clone)]
pub struct TimerOutcome {
    pub habit: Habit,
    pub session: Option<HabitSession>,
}

/// One completed (habit, day) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub habit_id: String,
    pub date: NaiveDate,
}

/// Inclusive date window for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HistoryRange {
    /// Either an explicit `start`/`end` pair or the last `days` days ending
    /// `today` (default 7, at most 180).
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        days: Option<u32>,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let days = days.unwrap_or(HISTORY_DEFAULT_DAYS);
        if !(1..=HISTORY_MAX_DAYS).contains(&days) {
            return Err(ValidationError::invalid(
                "days",
                format!("must be between 1 and {HISTORY_MAX_DAYS}"),
            ));
        }
        match (start, end) {
            (Some(start), Some(end)) => {
                let start = parse_date(start)?;
                let end = parse_date(end)?;
                if end < start {
                    return Err(ValidationError::InvertedDateRange);
                }
                Ok(Self { start, end })
            }
            (None, None) => Ok(Self {
                start: today - Duration::days(i64::from(days) - 1),
                end: today,
            }),
            _ => Err(ValidationError::IncompleteDateRange),
        }
    }
}

/// Ledger operations over one database handle.
pub struct CompletionLedger<'a> {
    db: &'a mut Database,
    lookahead_days: u32,
}

impl<'a> CompletionLedger<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self {
            db,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }

    pub fn with_lookahead(mut self, days: u32) -> Self {
        self.lookahead_days = days;
        self
    }

    /// Mark `habit_id` done on `day`.
    ///
    /// Replaces any existing row for the day. Only a net-new completion
    /// closes the day's timer and awards XP; a repeat keeps the first award.
    pub fn complete(
        &mut self,
        user_id: &str,
        habit_id: &str,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let lookahead = self.lookahead_days;
        let today = today_utc(now);
        ensure_within_horizon(day, today, lookahead)?;
        let tx = self.db.write_tx()?;

        let mut habit = load_habit(&tx, user_id, habit_id)?;
        if !habit.schedule().applies_on(day) {
            return Err(CoreError::NotApplicable {
                habit_id: habit_id.to_string(),
                date: day,
            });
        }

        let prior = store::take_completion(&tx, user_id, habit_id, day)?;
        let mut completed = store::completed_days(&tx, user_id, habit_id)?;
        completed.insert(day);
        let derived = DerivedState::compute(&habit.schedule(), &completed, today, lookahead);

        let (xp_awarded, actual_minutes, session) = match &prior {
            Some(previous) => (
                previous.xp_awarded,
                previous.actual_minutes,
                store::find_session(&tx, user_id, habit_id, day)?,
            ),
            None => {
                let mut session = store::find_session(&tx, user_id, habit_id, day)?;
                let actual_minutes = match session.as_mut() {
                    Some(s) => {
                        if s.pause(now) {
                            store::upsert_session(&tx, s)?;
                        }
                        s.tracked_minutes(now)
                    }
                    None => None,
                };
                let xp = habit_completion_xp(&HabitSignals {
                    planned_minutes: habit.duration_minutes,
                    actual_minutes,
                    completed_on_time: today <= day,
                    habit_streak: derived.streak.current,
                });
                (xp, actual_minutes, session)
            }
        };

        store::insert_completion(
            &tx,
            &HabitCompletion {
                id: uuid::Uuid::new_v4().to_string(),
                habit_id: habit_id.to_string(),
                user_id: user_id.to_string(),
                completed_on: day,
                completed_at: now,
                xp_awarded,
                actual_minutes,
            },
        )?;

        let (xp_delta, progress) = if prior.is_none() {
            (xp_awarded, Some(profile::apply_experience_delta(&tx, user_id, xp_awarded)?))
        } else {
            (0, None)
        };

        habit.apply_derived(&derived);
        store::save_habit(&tx, &habit)?;
        tx.commit()?;

        tracing::info!(
            user_id,
            habit_id,
            %day,
            xp_delta,
            current_streak = habit.current_streak,
            repeat = prior.is_some(),
            "habit completed"
        );

        Ok(CompletionOutcome {
            habit,
            date: day,
            completed: true,
            xp_delta,
            progress,
            session,
        })
    }

    /// Remove the completion for `day`, if any, and reverse its award.
    pub fn uncomplete(
        &mut self,
        user_id: &str,
        habit_id: &str,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let lookahead = self.lookahead_days;
        let today = today_utc(now);
        let tx = self.db.write_tx()?;

        let mut habit = load_habit(&tx, user_id, habit_id)?;
        let removed = store::take_completion(&tx, user_id, habit_id, day)?;

        let awarded = removed.as_ref().map(|c| c.xp_awarded).unwrap_or(0);
        let (xp_delta, progress) = if awarded > 0 {
            (-awarded, Some(profile::apply_experience_delta(&tx, user_id, -awarded)?))
        } else {
            (0, None)
        };

        let completed = store::completed_days(&tx, user_id, habit_id)?;
        let derived = DerivedState::compute(&habit.schedule(), &completed, today, lookahead);
        habit.apply_derived(&derived);
        store::save_habit(&tx, &habit)?;
        let session = store::find_session(&tx, user_id, habit_id, day)?;
        tx.commit()?;

        tracing::info!(
            user_id,
            habit_id,
            %day,
            xp_delta,
            removed = removed.is_some(),
            "habit completion removed"
        );

        Ok(CompletionOutcome {
            habit,
            date: day,
            completed: false,
            xp_delta,
            progress,
            session,
        })
    }

    /// Open or resume the timer for (habit, day). A running timer is left as
    /// is.
    pub fn start_timer(
        &mut self,
        user_id: &str,
        habit_id: &str,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TimerOutcome> {
        ensure_within_horizon(day, today_utc(now), self.lookahead_days)?;
        let tx = self.db.write_tx()?;

        let habit = load_habit(&tx, user_id, habit_id)?;
        if !habit.schedule().applies_on(day) {
            return Err(CoreError::NotApplicable {
                habit_id: habit_id.to_string(),
                date: day,
            });
        }
        if store::find_completion(&tx, user_id, habit_id, day)?.is_some() {
            return Err(ValidationError::AlreadyCompleted.into());
        }

        let session = match store::find_session(&tx, user_id, habit_id, day)? {
            Some(mut existing) => {
                if existing.resume(now) {
                    store::upsert_session(&tx, &existing)?;
                }
                existing
            }
            None => {
                let fresh = HabitSession::begin(habit_id, user_id, day, now);
                store::upsert_session(&tx, &fresh)?;
                fresh
            }
        };
        tx.commit()?;

        tracing::debug!(user_id, habit_id, %day, banked = session.accumulated_seconds, "habit timer running");
        Ok(TimerOutcome {
            habit,
            session: Some(session),
        })
    }

    /// Close the running timer segment for (habit, day), if there is one.
    pub fn pause_timer(
        &mut self,
        user_id: &str,
        habit_id: &str,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TimerOutcome> {
        let tx = self.db.write_tx()?;

        let habit = load_habit(&tx, user_id, habit_id)?;
        let mut session = store::find_session(&tx, user_id, habit_id, day)?;
        if let Some(s) = session.as_mut() {
            if s.pause(now) {
                store::upsert_session(&tx, s)?;
                tracing::debug!(user_id, habit_id, %day, banked = s.accumulated_seconds, "habit timer paused");
            }
        }
        tx.commit()?;

        Ok(TimerOutcome { habit, session })
    }

    /// Completions in `range`, optionally for one habit, oldest first.
    pub fn history(
        &self,
        user_id: &str,
        habit_id: Option<&str>,
        range: HistoryRange,
    ) -> Result<Vec<HistoryEntry>> {
        store::completion_history(self.db.conn(), user_id, habit_id, range.start, range.end)
    }
}

fn load_habit(conn: &Connection, user_id: &str, habit_id: &str) -> Result<Habit> {
    store::get_habit(conn, user_id, habit_id)?.ok_or_else(|| CoreError::not_found("Habit", habit_id))
}

/// Streak recomputation walks every day up to the latest completion, so a
/// day past the lookahead window is refused outright.
fn ensure_within_horizon(day: NaiveDate, today: NaiveDate, lookahead_days: u32) -> Result<()> {
    match today.checked_add_days(Days::new(u64::from(lookahead_days))) {
        Some(horizon) if day > horizon => Err(ValidationError::BeyondHorizon.into()),
        _ => Ok(()),
    }
}
