//! Task CRUD and completion XP.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

use super::{CompletionChange, NewTask, Task, TaskFilter, TaskPatch};
use crate::dates::today_utc;
use crate::error::{CoreError, Result};
use crate::progression::Progress;
use crate::scoring::{task_completion_xp, TaskSignals};
use crate::storage::{categories, profile, tasks as store, Database};

/// Result of a task update.
#[derive(Debug, Clone)]
pub struct TaskUpdate {
    pub task: Task,
    pub xp_delta: i64,
    pub progress: Option<Progress>,
}

pub struct TaskService<'a> {
    db: &'a mut Database,
}

impl<'a> TaskService<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    pub fn list(&self, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
        store::list_tasks(self.db.conn(), user_id, filter)
    }

    pub fn get(&self, user_id: &str, task_id: &str) -> Result<Task> {
        store::get_task(self.db.conn(), user_id, task_id)?
            .ok_or_else(|| CoreError::not_found("Task", task_id))
    }

    pub fn create(&mut self, user_id: &str, input: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let task = input.into_task(user_id, now)?;
        ensure_category(self.db.conn(), user_id, task.category_id.as_deref())?;
        store::insert_task(self.db.conn(), &task)?;
        tracing::info!(user_id, task_id = %task.id, priority = task.priority, "task created");
        Ok(task)
    }

    /// Apply a partial update. Completing awards XP, reopening reverses the
    /// award, both in the same transaction as the row write.
    pub fn update(
        &mut self,
        user_id: &str,
        task_id: &str,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<TaskUpdate> {
        let tx = self.db.write_tx()?;

        let mut task = store::get_task(&tx, user_id, task_id)?
            .ok_or_else(|| CoreError::not_found("Task", task_id))?;
        let change = patch.apply_to(&mut task, now)?;
        if let Some(Some(category_id)) = &patch.category_id {
            ensure_category(&tx, user_id, Some(category_id))?;
        }

        let xp_delta = match change {
            CompletionChange::Completed => {
                store::save_task(&tx, &task)?;
                let days = store::completed_task_days(&tx, user_id)?;
                let xp = task_completion_xp(&TaskSignals {
                    priority: task.priority,
                    planned_minutes: task.duration_minutes,
                    actual_minutes: task.tracked_minutes(now),
                    completed_on_time: now <= task.deadline,
                    completion_streak: completion_streak(&days, today_utc(now)),
                });
                task.xp_awarded = xp;
                xp
            }
            CompletionChange::Reopened => {
                let reversed = -task.xp_awarded.max(0);
                task.xp_awarded = 0;
                reversed
            }
            CompletionChange::Unchanged => 0,
        };

        store::save_task(&tx, &task)?;
        let progress = if xp_delta != 0 {
            Some(profile::apply_experience_delta(&tx, user_id, xp_delta)?)
        } else {
            None
        };
        tx.commit()?;

        tracing::info!(user_id, task_id, xp_delta, "task updated");
        Ok(TaskUpdate {
            task,
            xp_delta,
            progress,
        })
    }

    pub fn delete(&mut self, user_id: &str, task_id: &str) -> Result<()> {
        if !store::delete_task(self.db.conn(), user_id, task_id)? {
            return Err(CoreError::not_found("Task", task_id));
        }
        tracing::info!(user_id, task_id, "task deleted");
        Ok(())
    }
}

fn ensure_category(conn: &Connection, user_id: &str, category_id: Option<&str>) -> Result<()> {
    match category_id {
        Some(id) if categories::get_category(conn, user_id, id)?.is_none() => {
            Err(CoreError::not_found("Category", id))
        }
        _ => Ok(()),
    }
}

/// Consecutive days ending on `today` with at least one completed task.
pub fn completion_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}
