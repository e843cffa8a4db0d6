pub mod categories;
mod config;
pub mod database;
pub mod habits;
pub mod migrations;
pub mod profile;
pub mod tasks;

pub use config::{AuthConfig, Config, DatabaseConfig, HabitsConfig, ServerConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/dodo[-dev]/` based on DODO_ENV.
///
/// Set DODO_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .ok_or(ConfigError::NoDataDir)?;

    let env = std::env::var("DODO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("dodo-dev")
    } else {
        base_dir.join("dodo")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
