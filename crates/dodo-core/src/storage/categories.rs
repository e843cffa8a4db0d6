//! Category queries.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::category::Category;
use crate::error::Result;

fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        icon: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_category(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories (id, user_id, name, color, icon, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            category.id,
            category.user_id,
            category.name,
            category.color,
            category.icon,
            category.created_at,
        ],
    )?;
    Ok(())
}

pub fn save_category(conn: &Connection, category: &Category) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE categories SET name = ?3, color = ?4, icon = ?5 WHERE id = ?1 AND user_id = ?2",
        params![
            category.id,
            category.user_id,
            category.name,
            category.color,
            category.icon,
        ],
    )?;
    Ok(changed > 0)
}

pub fn get_category(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, user_id, name, color, icon, created_at FROM categories
             WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            row_to_category,
        )
        .optional()?;
    Ok(category)
}

pub fn list_categories(conn: &Connection, user_id: &str) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, color, icon, created_at FROM categories
         WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;
    let categories = stmt
        .query_map(params![user_id], row_to_category)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(categories)
}

/// Tasks in the category keep existing with `category_id` cleared.
pub fn delete_category(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(removed > 0)
}
