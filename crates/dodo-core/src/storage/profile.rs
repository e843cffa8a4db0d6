//! Profile XP storage.
//!
//! Profiles are created lazily on the first XP change; a user without a row
//! reads as zero XP at level 1.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{DatabaseError, Result};
use crate::progression::{apply_delta, progress_from_experience, Progress};

/// Total XP for a user, 0 if no profile row exists yet.
pub fn load_experience(conn: &Connection, user_id: &str) -> Result<u64> {
    let stored: Option<i64> = conn
        .query_row(
            "SELECT experience_points FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        None => Ok(0),
        Some(xp) => u64::try_from(xp).map_err(|_| {
            DatabaseError::CorruptValue {
                column: "experience_points",
                value: xp.to_string(),
            }
            .into()
        }),
    }
}

pub fn load_progress(conn: &Connection, user_id: &str) -> Result<Progress> {
    Ok(progress_from_experience(load_experience(conn, user_id)?))
}

/// Add `delta` to the user's total (clamped at zero) and store the new level.
///
/// Call this inside the same transaction as the write that earned the XP.
pub fn apply_experience_delta(conn: &Connection, user_id: &str, delta: i64) -> Result<Progress> {
    let current = load_experience(conn, user_id)?;
    let progress = apply_delta(current, delta);
    let total = i64::try_from(progress.experience_points).unwrap_or(i64::MAX);
    conn.execute(
        "INSERT INTO profiles (user_id, experience_points, current_level, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id) DO UPDATE SET
            experience_points = excluded.experience_points,
            current_level = excluded.current_level,
            updated_at = excluded.updated_at",
        params![user_id, total, progress.level, Utc::now()],
    )?;
    tracing::debug!(user_id, delta, total, level = progress.level, "experience updated");
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn missing_profile_reads_as_zero() {
        let db = Database::open_memory().unwrap();
        assert_eq!(load_experience(db.conn(), "u1").unwrap(), 0);
        assert_eq!(load_progress(db.conn(), "u1").unwrap().level, 1);
    }

    #[test]
    fn deltas_accumulate_and_clamp() {
        let db = Database::open_memory().unwrap();
        let p = apply_experience_delta(db.conn(), "u1", 250).unwrap();
        assert_eq!(p.level, 2);
        let p = apply_experience_delta(db.conn(), "u1", -1000).unwrap();
        assert_eq!(p.experience_points, 0);
        assert_eq!(load_experience(db.conn(), "u1").unwrap(), 0);
        let level: u32 = db
            .conn()
            .query_row("SELECT current_level FROM profiles WHERE user_id = 'u1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(level, 1);
    }

    #[test]
    fn profiles_are_per_user() {
        let db = Database::open_memory().unwrap();
        apply_experience_delta(db.conn(), "u1", 80).unwrap();
        assert_eq!(load_experience(db.conn(), "u2").unwrap(), 0);
    }
}
