//! Task categories: a name plus one of a fixed set of colours and icons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::storage::{categories as store, Database};

pub const NAME_MAX_CHARS: usize = 50;

pub const PALETTE: [&str; 8] = [
    "#E8651A", "#30A46C", "#3B82F6", "#E5484D", "#F5A623", "#8B5CF6", "#14B8A6", "#EC4899",
];

pub const ICONS: [&str; 10] = [
    "inbox",
    "briefcase",
    "check-square",
    "calendar",
    "flame",
    "heart",
    "user",
    "settings",
    "repeat",
    "zap",
];

pub const DEFAULT_COLOR: &str = PALETTE[0];
pub const DEFAULT_ICON: &str = ICONS[0];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl NewCategory {
    pub fn into_category(self, user_id: &str, now: DateTime<Utc>) -> Result<Category, ValidationError> {
        Ok(Category {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: clean_name(&self.name)?,
            color: check_color(self.color.as_deref().unwrap_or(DEFAULT_COLOR))?,
            icon: check_icon(self.icon.as_deref().unwrap_or(DEFAULT_ICON))?,
            created_at: now,
        })
    }
}

impl CategoryPatch {
    pub fn apply_to(&self, category: &mut Category) -> Result<(), ValidationError> {
        if self.name.is_none() && self.color.is_none() && self.icon.is_none() {
            return Err(ValidationError::EmptyPatch);
        }
        let name = self.name.as_deref().map(clean_name).transpose()?;
        let color = self.color.as_deref().map(check_color).transpose()?;
        let icon = self.icon.as_deref().map(check_icon).transpose()?;

        if let Some(name) = name {
            category.name = name;
        }
        if let Some(color) = color {
            category.color = color;
        }
        if let Some(icon) = icon {
            category.icon = icon;
        }
        Ok(())
    }
}

fn clean_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(ValidationError::invalid(
            "name",
            format!("must be 1-{NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(name.to_string())
}

fn check_color(color: &str) -> Result<String, ValidationError> {
    if PALETTE.contains(&color) {
        Ok(color.to_string())
    } else {
        Err(ValidationError::invalid("color", "must be one of the palette colours"))
    }
}

fn check_icon(icon: &str) -> Result<String, ValidationError> {
    if ICONS.contains(&icon) {
        Ok(icon.to_string())
    } else {
        Err(ValidationError::invalid("icon", "unknown icon"))
    }
}

pub struct CategoryService<'a> {
    db: &'a Database,
}

impl<'a> CategoryService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Category>> {
        store::list_categories(self.db.conn(), user_id)
    }

    pub fn create(&self, user_id: &str, input: NewCategory, now: DateTime<Utc>) -> Result<Category> {
        let category = input.into_category(user_id, now)?;
        store::insert_category(self.db.conn(), &category)?;
        tracing::info!(user_id, category_id = %category.id, "category created");
        Ok(category)
    }

    pub fn update(&self, user_id: &str, category_id: &str, patch: &CategoryPatch) -> Result<Category> {
        let mut category = store::get_category(self.db.conn(), user_id, category_id)?
            .ok_or_else(|| CoreError::not_found("Category", category_id))?;
        patch.apply_to(&mut category)?;
        store::save_category(self.db.conn(), &category)?;
        Ok(category)
    }

    /// Delete a category; its tasks become uncategorised.
    pub fn delete(&self, user_id: &str, category_id: &str) -> Result<()> {
        if !store::delete_category(self.db.conn(), user_id, category_id)? {
            return Err(CoreError::not_found("Category", category_id));
        }
        tracing::info!(user_id, category_id, "category deleted");
        Ok(())
    }
}
