//! Row mapping and queries for habits, completions and timer sessions.
//!
//! Every function takes a plain `&Connection` so callers can run it either
//! directly or inside a transaction (which derefs to a connection). All
//! queries are scoped by `user_id`.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{DatabaseError, Result};
use crate::habit::{
    FrequencyType, Habit, HabitCompletion, HabitSession, HistoryEntry, Recurrence, WeekdaySet,
};

const HABIT_COLUMNS: &str = "id, user_id, title, frequency_type, interval_days, custom_days, \
     anchor_date, time_minute, duration_minutes, current_streak, best_streak, \
     last_completed_on, next_occurrence_on, created_at";

const COMPLETION_COLUMNS: &str =
    "id, habit_id, user_id, completed_on, completed_at, xp_awarded, actual_minutes";

const SESSION_COLUMNS: &str =
    "id, habit_id, user_id, session_on, started_at, ended_at, accumulated_seconds";

fn corrupt(idx: usize, column: &'static str, value: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(DatabaseError::CorruptValue {
            column,
            value: value.into(),
        }),
    )
}

/// Build a Habit from a row selected with `HABIT_COLUMNS`.
fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
    let kind_str: String = row.get(3)?;
    let kind =
        FrequencyType::parse(&kind_str).ok_or_else(|| corrupt(3, "frequency_type", kind_str))?;

    let interval_days: Option<u32> = row.get(4)?;
    let days_json: String = row.get(5)?;
    let days: Vec<i64> = serde_json::from_str(&days_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    // Stored rows are not re-validated: a zero or missing interval simply
    // never applies.
    let recurrence = match kind {
        FrequencyType::Daily => Recurrence::Daily,
        FrequencyType::Interval => Recurrence::Interval {
            days: interval_days.unwrap_or(0),
        },
        FrequencyType::CustomDays => Recurrence::CustomDays(WeekdaySet::from_days(days)),
    };

    Ok(Habit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        recurrence,
        anchor_date: row.get(6)?,
        time_minute: row.get(7)?,
        duration_minutes: row.get(8)?,
        current_streak: row.get(9)?,
        best_streak: row.get(10)?,
        last_completed_on: row.get(11)?,
        next_occurrence_on: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn row_to_completion(row: &Row) -> rusqlite::Result<HabitCompletion> {
    Ok(HabitCompletion {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        user_id: row.get(2)?,
        completed_on: row.get(3)?,
        completed_at: row.get(4)?,
        xp_awarded: row.get(5)?,
        actual_minutes: row.get(6)?,
    })
}

fn row_to_session(row: &Row) -> rusqlite::Result<HabitSession> {
    Ok(HabitSession {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        user_id: row.get(2)?,
        session_on: row.get(3)?,
        started_at: row.get(4)?,
        ended_at: row.get(5)?,
        accumulated_seconds: row.get(6)?,
    })
}

// === Habits ===

pub fn insert_habit(conn: &Connection, habit: &Habit) -> Result<()> {
    let custom_days = serde_json::to_string(&habit.recurrence.custom_days())?;
    conn.execute(
        &format!("INSERT INTO habits ({HABIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
        params![
            habit.id,
            habit.user_id,
            habit.title,
            habit.recurrence.frequency_type().as_str(),
            habit.recurrence.interval_days(),
            custom_days,
            habit.anchor_date,
            habit.time_minute,
            habit.duration_minutes,
            habit.current_streak,
            habit.best_streak,
            habit.last_completed_on,
            habit.next_occurrence_on,
            habit.created_at,
        ],
    )?;
    Ok(())
}

/// Write back every mutable column. Returns false if the row is gone.
pub fn save_habit(conn: &Connection, habit: &Habit) -> Result<bool> {
    let custom_days = serde_json::to_string(&habit.recurrence.custom_days())?;
    let changed = conn.execute(
        "UPDATE habits SET
            title = ?3, frequency_type = ?4, interval_days = ?5, custom_days = ?6,
            time_minute = ?7, duration_minutes = ?8, current_streak = ?9, best_streak = ?10,
            last_completed_on = ?11, next_occurrence_on = ?12
         WHERE id = ?1 AND user_id = ?2",
        params![
            habit.id,
            habit.user_id,
            habit.title,
            habit.recurrence.frequency_type().as_str(),
            habit.recurrence.interval_days(),
            custom_days,
            habit.time_minute,
            habit.duration_minutes,
            habit.current_streak,
            habit.best_streak,
            habit.last_completed_on,
            habit.next_occurrence_on,
        ],
    )?;
    Ok(changed > 0)
}

pub fn get_habit(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Habit>> {
    let habit = conn
        .query_row(
            &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            row_to_habit,
        )
        .optional()?;
    Ok(habit)
}

pub fn list_habits(conn: &Connection, user_id: &str) -> Result<Vec<Habit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC"
    ))?;
    let habits = stmt
        .query_map(params![user_id], row_to_habit)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(habits)
}

/// Delete a habit; completions and sessions cascade. Returns false if absent.
pub fn delete_habit(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(removed > 0)
}

// === Completions ===

pub fn find_completion(
    conn: &Connection,
    user_id: &str,
    habit_id: &str,
    day: NaiveDate,
) -> Result<Option<HabitCompletion>> {
    let completion = conn
        .query_row(
            &format!(
                "SELECT {COMPLETION_COLUMNS} FROM habit_completions
                 WHERE user_id = ?1 AND habit_id = ?2 AND completed_on = ?3
                 ORDER BY completed_at ASC LIMIT 1"
            ),
            params![user_id, habit_id, day],
            row_to_completion,
        )
        .optional()?;
    Ok(completion)
}

/// Remove every completion row for (habit, day), returning the oldest one.
pub fn take_completion(
    conn: &Connection,
    user_id: &str,
    habit_id: &str,
    day: NaiveDate,
) -> Result<Option<HabitCompletion>> {
    let existing = find_completion(conn, user_id, habit_id, day)?;
    if existing.is_some() {
        conn.execute(
            "DELETE FROM habit_completions WHERE user_id = ?1 AND habit_id = ?2 AND completed_on = ?3",
            params![user_id, habit_id, day],
        )?;
    }
    Ok(existing)
}

pub fn insert_completion(conn: &Connection, completion: &HabitCompletion) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO habit_completions ({COMPLETION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ),
        params![
            completion.id,
            completion.habit_id,
            completion.user_id,
            completion.completed_on,
            completion.completed_at,
            completion.xp_awarded,
            completion.actual_minutes,
        ],
    )?;
    Ok(())
}

pub fn completed_days(
    conn: &Connection,
    user_id: &str,
    habit_id: &str,
) -> Result<BTreeSet<NaiveDate>> {
    let mut stmt = conn.prepare(
        "SELECT completed_on FROM habit_completions WHERE user_id = ?1 AND habit_id = ?2",
    )?;
    let days = stmt
        .query_map(params![user_id, habit_id], |row| row.get::<_, NaiveDate>(0))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    Ok(days)
}

pub fn completion_history(
    conn: &Connection,
    user_id: &str,
    habit_id: Option<&str>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT habit_id, completed_on FROM habit_completions
         WHERE user_id = ?1 AND completed_on >= ?2 AND completed_on <= ?3
           AND (?4 IS NULL OR habit_id = ?4)
         ORDER BY completed_on ASC, habit_id ASC",
    )?;
    let entries = stmt
        .query_map(params![user_id, start, end, habit_id], |row| {
            Ok(HistoryEntry {
                habit_id: row.get(0)?,
                date: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

// === Sessions ===

pub fn find_session(
    conn: &Connection,
    user_id: &str,
    habit_id: &str,
    day: NaiveDate,
) -> Result<Option<HabitSession>> {
    let session = conn
        .query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM habit_sessions
                 WHERE user_id = ?1 AND habit_id = ?2 AND session_on = ?3"
            ),
            params![user_id, habit_id, day],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

pub fn upsert_session(conn: &Connection, session: &HabitSession) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO habit_sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (habit_id, session_on) DO UPDATE SET
                started_at = excluded.started_at,
                ended_at = excluded.ended_at,
                accumulated_seconds = excluded.accumulated_seconds"
        ),
        params![
            session.id,
            session.habit_id,
            session.user_id,
            session.session_on,
            session.started_at,
            session.ended_at,
            session.accumulated_seconds,
        ],
    )?;
    Ok(())
}

/// All of a user's sessions for one day.
pub fn sessions_on(conn: &Connection, user_id: &str, day: NaiveDate) -> Result<Vec<HabitSession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM habit_sessions WHERE user_id = ?1 AND session_on = ?2"
    ))?;
    let sessions = stmt
        .query_map(params![user_id, day], row_to_session)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::test_support::{day, habit};
    use crate::storage::Database;

    fn seeded() -> (Database, Habit) {
        let db = Database::open_memory().unwrap();
        let h = habit(
            Recurrence::CustomDays(WeekdaySet::from_days([1i64, 5])),
            day(2024, 3, 1),
        );
        insert_habit(db.conn(), &h).unwrap();
        (db, h)
    }

    fn completion(h: &Habit, on: NaiveDate, xp: i64) -> HabitCompletion {
        HabitCompletion {
            id: uuid::Uuid::new_v4().to_string(),
            habit_id: h.id.clone(),
            user_id: h.user_id.clone(),
            completed_on: on,
            completed_at: on.and_hms_opt(20, 0, 0).unwrap().and_utc(),
            xp_awarded: xp,
            actual_minutes: None,
        }
    }

    #[test]
    fn habit_round_trips_through_row() {
        let (db, h) = seeded();
        let loaded = get_habit(db.conn(), &h.user_id, &h.id).unwrap().unwrap();
        assert_eq!(loaded, h);
    }

    #[test]
    fn habits_are_scoped_by_user() {
        let (db, h) = seeded();
        assert!(get_habit(db.conn(), "someone-else", &h.id).unwrap().is_none());
        assert!(list_habits(db.conn(), "someone-else").unwrap().is_empty());
        assert!(!delete_habit(db.conn(), "someone-else", &h.id).unwrap());
    }

    #[test]
    fn take_completion_removes_and_returns_row() {
        let (db, h) = seeded();
        insert_completion(db.conn(), &completion(&h, day(2024, 3, 4), 80)).unwrap();
        let taken = take_completion(db.conn(), &h.user_id, &h.id, day(2024, 3, 4)).unwrap();
        assert_eq!(taken.map(|c| c.xp_awarded), Some(80));
        assert!(find_completion(db.conn(), &h.user_id, &h.id, day(2024, 3, 4))
            .unwrap()
            .is_none());
        assert!(take_completion(db.conn(), &h.user_id, &h.id, day(2024, 3, 4))
            .unwrap()
            .is_none());
    }

    #[test]
    fn history_filters_by_range_and_habit() {
        let (db, h) = seeded();
        for d in [day(2024, 3, 4), day(2024, 3, 8), day(2024, 3, 11)] {
            insert_completion(db.conn(), &completion(&h, d, 0)).unwrap();
        }
        let all = completion_history(db.conn(), &h.user_id, None, day(2024, 3, 4), day(2024, 3, 8)).unwrap();
        assert_eq!(all.len(), 2);
        let none = completion_history(db.conn(), &h.user_id, Some("other"), day(2024, 3, 1), day(2024, 3, 31)).unwrap();
        assert!(none.is_empty());
        let days = completed_days(db.conn(), &h.user_id, &h.id).unwrap();
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn deleting_habit_cascades() {
        let (db, h) = seeded();
        insert_completion(db.conn(), &completion(&h, day(2024, 3, 4), 0)).unwrap();
        let session = HabitSession::begin(&h.id, &h.user_id, day(2024, 3, 4), day(2024, 3, 4).and_hms_opt(7, 0, 0).unwrap().and_utc());
        upsert_session(db.conn(), &session).unwrap();
        assert!(delete_habit(db.conn(), &h.user_id, &h.id).unwrap());
        assert!(completed_days(db.conn(), &h.user_id, &h.id).unwrap().is_empty());
        assert!(sessions_on(db.conn(), &h.user_id, day(2024, 3, 4)).unwrap().is_empty());
    }

    #[test]
    fn upsert_session_updates_existing_day() {
        let (db, h) = seeded();
        let start = day(2024, 3, 4).and_hms_opt(7, 0, 0).unwrap().and_utc();
        let mut session = HabitSession::begin(&h.id, &h.user_id, day(2024, 3, 4), start);
        upsert_session(db.conn(), &session).unwrap();
        session.pause(start + chrono::Duration::minutes(12));
        upsert_session(db.conn(), &session).unwrap();
        let loaded = find_session(db.conn(), &h.user_id, &h.id, day(2024, 3, 4))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.accumulated_seconds, 720);
        assert!(!loaded.is_running());
    }
}
