//! HTTP API for dodo.
//!
//! A thin axum layer over `dodo-core`: every route authenticates the caller,
//! runs one core call under the database lock on the blocking pool, and maps
//! core errors onto `{"error": ...}` responses.

pub mod error;
pub mod extract;
pub mod routes;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::HeaderValue;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use dodo_core::{Authenticator, Config, ConfigError, Database};

use crate::error::ApiError;

/// Shared server state.
pub struct AppState {
    db: Mutex<Database>,
    pub auth: Authenticator,
    pub config: Config,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: Database, auth: Authenticator, config: Config) -> SharedState {
        Arc::new(Self {
            db: Mutex::new(db),
            auth,
            config,
        })
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }

    /// Run `work` against the database on the blocking pool. rusqlite is
    /// synchronous, so store calls stay off the async workers.
    pub async fn run_db<T, F>(self: &Arc<Self>, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Database) -> dodo_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut db = state.lock_db()?;
            work(&mut *db).map_err(ApiError::from)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database task failed");
            ApiError::Internal("database task failed".to_string())
        })?
    }

    pub fn lookahead_days(&self) -> u32 {
        self.config.habits.max_lookahead_days
    }
}

/// Read the config file and apply `DODO_*` overrides from `lookup`.
/// A file that exists but cannot be read or parsed is an error.
pub fn load_config<F>(path: &Path, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::load_from(path)?;
    config.apply_overrides(lookup)?;
    Ok(config)
}

/// `*` allows any origin without credentials; a concrete origin is allowed
/// with credentials.
pub fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS origin, cross-origin requests disabled");
            CorsLayer::new()
        }
    }
}

pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        // Profile.
        .route("/api/profile", get(routes::profile::get_profile))
        // Habits. Static /history before wildcard /{id}.
        .route(
            "/api/habits",
            get(routes::habits::list_habits).post(routes::habits::create_habit),
        )
        .route("/api/habits/history", get(routes::habits::habit_history))
        .route(
            "/api/habits/{id}",
            patch(routes::habits::update_habit).delete(routes::habits::delete_habit),
        )
        .route(
            "/api/habits/{id}/complete",
            post(routes::habits::complete_habit).delete(routes::habits::uncomplete_habit),
        )
        .route("/api/habits/{id}/start", post(routes::habits::start_timer))
        .route("/api/habits/{id}/pause", post(routes::habits::pause_timer))
        // Tasks.
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            patch(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        // Categories.
        .route(
            "/api/categories",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/api/categories/{id}",
            patch(routes::categories::update_category)
                .delete(routes::categories::delete_category),
        )
        .layer(cors)
        .with_state(state)
}
