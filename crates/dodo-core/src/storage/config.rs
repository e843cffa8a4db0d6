//! TOML-based application configuration.
//!
//! Holds:
//! - HTTP server binding and CORS origin
//! - Database location
//! - Auth provider settings or a static token table
//! - Habit engine limits
//!
//! Configuration is stored at `~/.config/dodo/config.toml`. A handful of
//! `DODO_*` environment variables override the file at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::habit::DEFAULT_LOOKAHEAD_DAYS;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `*` or a single allowed origin.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

/// Database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Defaults to `dodo.db` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Bearer token verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of a Supabase-compatible auth service.
    #[serde(default)]
    pub provider_url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Token to user id, used when no provider is configured.
    #[serde(default)]
    pub static_tokens: HashMap<String, String>,
}

/// Habit engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitsConfig {
    #[serde(default = "default_max_lookahead_days")]
    pub max_lookahead_days: u32,
    #[serde(default = "default_history_days")]
    pub history_default_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dodo/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// User id the CLI acts as.
    #[serde(default = "default_local_user")]
    pub local_user: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub habits: HabitsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

// Default functions
fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    4000
}
fn default_cors_origin() -> String {
    "*".into()
}
fn default_max_lookahead_days() -> u32 {
    DEFAULT_LOOKAHEAD_DAYS
}
fn default_history_days() -> u32 {
    7
}
fn default_local_user() -> String {
    "local".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

impl Default for HabitsConfig {
    fn default() -> Self {
        Self {
            max_lookahead_days: default_max_lookahead_days(),
            history_default_days: default_history_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_user: default_local_user(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            habits: HabitsConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Strings and unset optional values
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `~/.config/dodo[-dev]/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit file, writing defaults there if it is missing.
    /// Any other read failure is an error and leaves the file alone.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| load_failed(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if key is
    /// unknown or the value does not fit the field.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Apply `DODO_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("DODO_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DODO_PORT".to_string(),
                message: format!("'{port}' is not a port number"),
            })?;
        }
        if let Some(bind) = lookup("DODO_BIND") {
            self.server.bind = bind;
        }
        if let Some(origin) = lookup("DODO_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Some(path) = lookup("DODO_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("DODO_AUTH_URL") {
            self.auth.provider_url = Some(url);
        }
        if let Some(key) = lookup("DODO_AUTH_ANON_KEY") {
            self.auth.anon_key = Some(key);
        }
        Ok(())
    }

    /// Configured database path, or `dodo.db` in the data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("dodo.db")),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, 4000);
        assert_eq!(parsed.server.cors_origin, "*");
        assert_eq!(parsed.habits.max_lookahead_days, 730);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[server]\nport = 8080\n").unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.server.bind, "0.0.0.0");
        assert_eq!(parsed.local_user, "local");
        assert_eq!(parsed.habits.history_default_days, 7);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("server.port").as_deref(), Some("4000"));
        assert_eq!(cfg.get("server.cors_origin").as_deref(), Some("*"));
        assert!(cfg.get("server.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_value_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set_value("habits.max_lookahead_days", "60").unwrap();
        assert_eq!(cfg.habits.max_lookahead_days, 60);
    }

    #[test]
    fn set_value_fills_optional_string() {
        let mut cfg = Config::default();
        cfg.set_value("auth.provider_url", "https://example.supabase.co")
            .unwrap();
        assert_eq!(
            cfg.auth.provider_url.as_deref(),
            Some("https://example.supabase.co")
        );
    }

    #[test]
    fn set_value_accepts_json_for_tables() {
        let mut cfg = Config::default();
        cfg.set_value("auth.static_tokens", r#"{"dev": "user-1"}"#)
            .unwrap();
        assert_eq!(cfg.auth.static_tokens.get("dev").map(String::as_str), Some("user-1"));
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("server.nonexistent_key", "value"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_value_rejects_out_of_range_port() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("server.port", "70000").is_err());
        assert!(cfg.set_value("server.port", "abc").is_err());
        assert_eq!(cfg.server.port, 4000);
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DODO_PORT", "5050"),
            ("DODO_DATABASE", "/tmp/dodo-test.db"),
            ("DODO_AUTH_URL", "http://localhost:54321"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.server.port, 5050);
        assert_eq!(cfg.database.path, Some(PathBuf::from("/tmp/dodo-test.db")));
        assert_eq!(cfg.auth.provider_url.as_deref(), Some("http://localhost:54321"));
        assert_eq!(cfg.database_path().unwrap(), PathBuf::from("/tmp/dodo-test.db"));
    }

    #[test]
    fn bad_port_override_is_an_error() {
        let mut cfg = Config::default();
        let result = cfg.apply_overrides(|name| (name == "DODO_PORT").then(|| "nope".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());

        cfg.set_value("server.port", "4100").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().server.port, 4100);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn load_from_keeps_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, [0xff, 0xfe]).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xfe]);
    }

    #[test]
    fn load_from_rejects_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load_from(dir.path()),
            Err(ConfigError::LoadFailed { .. })
        ));
        assert!(dir.path().is_dir());
    }
}
