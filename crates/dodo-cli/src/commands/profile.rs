use dodo_core::storage::profile::load_progress;
use serde_json::json;

use super::{print_json, Workspace};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Workspace { config, db } = Workspace::open()?;
    let progress = load_progress(db.conn(), &config.local_user)?;
    print_json(&json!({ "userId": config.local_user, "progress": progress }))
}
