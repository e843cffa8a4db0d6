//! Core error types for dodo-core.
//!
//! This module defines the error hierarchy shared by the engine, the storage
//! layer and the auth client. The HTTP layer maps these onto status codes;
//! nothing here knows about HTTP.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for dodo-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed input that never reached the store
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Bearer token problems
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// The entity does not exist for the calling user
    #[error("{entity} not found.")]
    NotFound { entity: &'static str, id: String },

    /// A completion or timer was requested for a day the habit is not due
    #[error("Habit does not apply on this date.")]
    NotApplicable { habit_id: String, date: NaiveDate },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded into its domain type
    #[error("Corrupt value in column '{column}': {value}")]
    CorruptValue { column: &'static str, value: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No usable home/config directory
    #[error("Cannot determine data directory")]
    NoDataDir,
}

/// Validation errors.
///
/// Display strings are the user-facing messages, so they stay static and
/// never include internals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date value.")]
    InvalidDate,

    #[error("Invalid {field} datetime.")]
    InvalidDateTime { field: &'static str },

    #[error("Both startDate and endDate are required together.")]
    IncompleteDateRange,

    #[error("endDate must be on or after startDate.")]
    InvertedDateRange,

    #[error("Both startAt and endAt are required for range filtering.")]
    IncompleteTimeRange,

    #[error("endAt must be after startAt.")]
    InvertedTimeRange,

    #[error("Use either date or startAt/endAt filters, not both.")]
    ConflictingFilters,

    #[error("At least one field is required.")]
    EmptyPatch,

    #[error("intervalDays is required for interval habits.")]
    MissingInterval,

    #[error("Select at least one custom day.")]
    MissingCustomDays,

    #[error("Habit is already completed for this date.")]
    AlreadyCompleted,

    #[error("date is beyond the scheduling horizon.")]
    BeyondHorizon,

    /// Field failed a length or range check
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// Auth provider errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token.")]
    MissingToken,

    #[error("Invalid or expired token.")]
    InvalidToken,

    /// The provider could not be reached at all
    #[error("Auth provider unavailable: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("Auth provider is not configured")]
    NotConfigured,
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_static() {
        assert_eq!(ValidationError::InvalidDate.to_string(), "Invalid date value.");
        assert_eq!(
            CoreError::from(ValidationError::InvertedDateRange).to_string(),
            "endDate must be on or after startDate."
        );
    }

    #[test]
    fn not_found_names_entity() {
        let err = CoreError::not_found("Habit", "abc");
        assert_eq!(err.to_string(), "Habit not found.");
    }

    #[test]
    fn rusqlite_errors_become_query_failures() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }
}
