//! SQLite connection handle.
//!
//! One `Database` owns one connection. Reads go through [`Database::conn`];
//! every multi-step write opens an `IMMEDIATE` transaction through
//! [`Database::write_tx`] so the write lock is taken before anything is read.

use std::path::Path;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, Result};

/// SQLite database for habits, tasks, categories and profiles.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/dodo/dodo.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("dodo.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests and throwaway runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        migrations::migrate(&conn)
            .map_err(|e| CoreError::Database(DatabaseError::MigrationFailed(e.to_string())))?;
        Ok(Self { conn })
    }

    /// Begin a transaction that holds the write lock from its first statement.
    pub fn write_tx(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_database_is_migrated() {
        let db = Database::open_memory().unwrap();
        let version = migrations::get_schema_version(db.conn()).unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[test]
    fn file_database_persists_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dodo.db");
        drop(Database::open_at(&path).unwrap());
        let reopened = Database::open_at(&path).unwrap();
        let fk: i64 = reopened
            .conn()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
