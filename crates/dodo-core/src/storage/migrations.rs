//! Database schema migrations for dodo.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tracing::debug!(version, "schema migrated");
    Ok(())
}

/// Migration v1: profiles, categories, tasks, habits, completions and timer sessions.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id           TEXT PRIMARY KEY,
            experience_points INTEGER NOT NULL DEFAULT 0,
            current_level     INTEGER NOT NULL DEFAULT 1,
            updated_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            name       TEXT NOT NULL,
            color      TEXT NOT NULL,
            icon       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            title            TEXT NOT NULL,
            description      TEXT NOT NULL DEFAULT '',
            category_id      TEXT REFERENCES categories(id) ON DELETE SET NULL,
            scheduled_at     TEXT NOT NULL,
            deadline         TEXT NOT NULL,
            duration_minutes INTEGER,
            priority         INTEGER NOT NULL CHECK (priority BETWEEN 1 AND 3),
            completed        INTEGER NOT NULL DEFAULT 0,
            completed_at     TEXT,
            timer_started_at TEXT,
            xp_awarded       INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id                 TEXT PRIMARY KEY,
            user_id            TEXT NOT NULL,
            title              TEXT NOT NULL,
            frequency_type     TEXT NOT NULL DEFAULT 'daily'
                               CHECK (frequency_type IN ('daily', 'interval', 'custom_days')),
            interval_days      INTEGER,
            custom_days        TEXT NOT NULL DEFAULT '[]',
            anchor_date        TEXT NOT NULL,
            time_minute        INTEGER,
            duration_minutes   INTEGER,
            current_streak     INTEGER NOT NULL DEFAULT 0,
            best_streak        INTEGER NOT NULL DEFAULT 0,
            last_completed_on  TEXT,
            next_occurrence_on TEXT,
            created_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habit_completions (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL,
            habit_id       TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            completed_on   TEXT NOT NULL,
            completed_at   TEXT NOT NULL,
            xp_awarded     INTEGER NOT NULL DEFAULT 0,
            actual_minutes INTEGER,
            UNIQUE (habit_id, completed_on)
        );

        CREATE TABLE IF NOT EXISTS habit_sessions (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            habit_id            TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            session_on          TEXT NOT NULL,
            started_at          TEXT NOT NULL,
            ended_at            TEXT,
            accumulated_seconds INTEGER NOT NULL DEFAULT 0,
            UNIQUE (habit_id, session_on)
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_user_scheduled ON tasks(user_id, scheduled_at);
        CREATE INDEX IF NOT EXISTS idx_tasks_user_completed_at ON tasks(user_id, completed_at);
        CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
        CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id);
        CREATE INDEX IF NOT EXISTS idx_completions_user_day ON habit_completions(user_id, completed_on);
        CREATE INDEX IF NOT EXISTS idx_sessions_user_day ON habit_sessions(user_id, session_on);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn schema_has_completion_xp_and_sessions() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let mut stmt = conn.prepare("PRAGMA table_info(habit_completions)").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|c| c.unwrap())
            .collect();
        assert!(columns.contains(&"xp_awarded".to_string()));
        assert!(columns.contains(&"actual_minutes".to_string()));

        let sessions: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'habit_sessions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(sessions, 1);
        assert_eq!(CURRENT_VERSION, 1);
    }
}
