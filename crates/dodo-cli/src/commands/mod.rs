pub mod category;
pub mod config;
pub mod habit;
pub mod profile;
pub mod task;

use std::error::Error;

use chrono::NaiveDate;
use dodo_core::dates::parse_date;
use dodo_core::{Config, Database};

/// Configuration plus an open database, acting as `config.local_user`.
pub struct Workspace {
    pub config: Config,
    pub db: Database,
}

impl Workspace {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let mut config = Config::load()?;
        config.apply_env_overrides()?;
        let db_path = config.database_path()?;
        let db = Database::open_at(&db_path)?;
        tracing::debug!(database = %db_path.display(), user = %config.local_user, "workspace opened");
        Ok(Self { config, db })
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse an optional `YYYY-MM-DD` argument, defaulting to `today`.
pub fn day_arg(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, Box<dyn Error>> {
    match raw {
        Some(value) => Ok(parse_date(value)?),
        None => Ok(today),
    }
}
