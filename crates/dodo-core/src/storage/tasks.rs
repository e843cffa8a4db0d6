//! Task queries.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};

use crate::error::Result;
use crate::task::{Task, TaskFilter};

const TASK_COLUMNS: &str = "id, user_id, title, description, category_id, scheduled_at, deadline, \
     duration_minutes, priority, completed, completed_at, timer_started_at, xp_awarded, created_at";

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category_id: row.get(4)?,
        scheduled_at: row.get(5)?,
        deadline: row.get(6)?,
        duration_minutes: row.get(7)?,
        priority: row.get(8)?,
        completed: row.get(9)?,
        completed_at: row.get(10)?,
        timer_started_at: row.get(11)?,
        xp_awarded: row.get(12)?,
        created_at: row.get(13)?,
    })
}

pub fn insert_task(conn: &Connection, task: &Task) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
        params![
            task.id,
            task.user_id,
            task.title,
            task.description,
            task.category_id,
            task.scheduled_at,
            task.deadline,
            task.duration_minutes,
            task.priority,
            task.completed,
            task.completed_at,
            task.timer_started_at,
            task.xp_awarded,
            task.created_at,
        ],
    )?;
    Ok(())
}

/// Write back every mutable column. Returns false if the row is gone.
pub fn save_task(conn: &Connection, task: &Task) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET
            title = ?3, description = ?4, category_id = ?5, scheduled_at = ?6, deadline = ?7,
            duration_minutes = ?8, priority = ?9, completed = ?10, completed_at = ?11,
            timer_started_at = ?12, xp_awarded = ?13
         WHERE id = ?1 AND user_id = ?2",
        params![
            task.id,
            task.user_id,
            task.title,
            task.description,
            task.category_id,
            task.scheduled_at,
            task.deadline,
            task.duration_minutes,
            task.priority,
            task.completed,
            task.completed_at,
            task.timer_started_at,
            task.xp_awarded,
        ],
    )?;
    Ok(changed > 0)
}

pub fn get_task(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

/// Open tasks first, then highest priority, then earliest deadline.
pub fn list_tasks(conn: &Connection, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
    let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?");
    let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(category_id) = &filter.category_id {
        sql.push_str(" AND category_id = ?");
        values.push(Box::new(category_id.clone()));
    }
    // Timestamps are stored in one UTC text form, so comparing them as text
    // orders them by time.
    if let Some((start, end)) = filter.window {
        sql.push_str(" AND scheduled_at >= ? AND scheduled_at < ?");
        values.push(Box::new(start));
        values.push(Box::new(end));
    }
    sql.push_str(" ORDER BY completed ASC, priority DESC, deadline ASC, rowid ASC");

    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params_from_iter(values.iter()), row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

pub fn delete_task(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(removed > 0)
}

/// UTC days on which the user completed at least one task.
pub fn completed_task_days(conn: &Connection, user_id: &str) -> Result<BTreeSet<NaiveDate>> {
    let mut stmt = conn.prepare(
        "SELECT completed_at FROM tasks
         WHERE user_id = ?1 AND completed = 1 AND completed_at IS NOT NULL",
    )?;
    let days = stmt
        .query_map(params![user_id], |row| row.get::<_, DateTime<Utc>>(0))?
        .map(|at| at.map(|at| at.date_naive()))
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    Ok(days)
}
