use chrono::Utc;
use clap::Subcommand;

use dodo_core::category::{ICONS, PALETTE};
use dodo_core::{CategoryPatch, CategoryService, NewCategory};

use super::{print_json, Workspace};

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories
    List,
    /// Create a category
    Create {
        name: String,
        /// Palette colour, e.g. "#3B82F6"
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Rename or restyle a category
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a category; its tasks become uncategorised
    Delete { id: String },
    /// Show the allowed colours and icons
    Palette,
}

pub fn run(action: CategoryAction) -> Result<(), Box<dyn std::error::Error>> {
    if let CategoryAction::Palette = action {
        return print_json(&serde_json::json!({ "colors": PALETTE, "icons": ICONS }));
    }

    let Workspace { config, db } = Workspace::open()?;
    let user = config.local_user.as_str();
    let service = CategoryService::new(&db);

    match action {
        CategoryAction::List => print_json(&service.list(user)?)?,
        CategoryAction::Create { name, color, icon } => {
            let category = service.create(user, NewCategory { name, color, icon }, Utc::now())?;
            print_json(&category)?;
        }
        CategoryAction::Update {
            id,
            name,
            color,
            icon,
        } => {
            let category = service.update(user, &id, &CategoryPatch { name, color, icon })?;
            print_json(&category)?;
        }
        CategoryAction::Delete { id } => {
            service.delete(user, &id)?;
            println!("Category deleted: {id}");
        }
        CategoryAction::Palette => {}
    }
    Ok(())
}
