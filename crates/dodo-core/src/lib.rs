//! # Dodo Core Library
//!
//! This library provides the core business logic for dodo, a habit and task
//! tracker with streaks and experience points. The HTTP server and the CLI
//! are thin layers over the same core library.
//!
//! ## Architecture
//!
//! - **Habit engine**: pure recurrence, forecasting and streak functions
//!   over calendar days
//! - **Completion ledger**: transactional complete/uncomplete and per-day
//!   timer sessions
//! - **Scoring**: XP awards and the level curve
//! - **Storage**: SQLite persistence and TOML-based configuration
//! - **Auth**: bearer token to user id resolution
//!
//! ## Key Components
//!
//! - [`CompletionLedger`]: completion and timer operations
//! - [`HabitService`], [`TaskService`], [`CategoryService`]: CRUD
//! - [`Database`]: persistence
//! - [`Config`]: application configuration management
//! - [`Authenticator`]: token verification

pub mod auth;
pub mod category;
pub mod dates;
pub mod error;
pub mod habit;
pub mod progression;
pub mod scoring;
pub mod storage;
pub mod task;

pub use auth::{bearer_token, Authenticator};
pub use category::{Category, CategoryPatch, CategoryService, NewCategory};
pub use error::{AuthError, ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use habit::{
    CompletionLedger, CompletionOutcome, FrequencyType, Habit, HabitPatch, HabitService,
    HabitView, HistoryEntry, HistoryRange, NewHabit, TimerOutcome,
};
pub use progression::Progress;
pub use storage::{Config, Database};
pub use task::service::TaskUpdate;
pub use task::{NewTask, Task, TaskFilter, TaskPatch, TaskService};
