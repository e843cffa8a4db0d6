//! Task management commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use dodo_core::{NewTask, TaskFilter, TaskPatch, TaskService};

use super::{print_json, Workspace};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Task description
        #[arg(long, default_value = "")]
        description: String,
        /// Category ID to file it under
        #[arg(long)]
        category_id: Option<String>,
        /// Planned start, RFC 3339
        #[arg(long)]
        scheduled_at: String,
        /// Deadline, RFC 3339
        #[arg(long)]
        deadline: String,
        /// Planned minutes
        #[arg(long)]
        duration: Option<u32>,
        /// 1 (low) to 3 (high)
        #[arg(long, default_value = "2")]
        priority: u8,
    },
    /// List tasks
    List {
        /// Filter by category ID
        #[arg(long)]
        category_id: Option<String>,
        /// One UTC day, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Range start, RFC 3339 (with --end-at)
        #[arg(long)]
        start_at: Option<String>,
        /// Range end, RFC 3339 (with --start-at)
        #[arg(long)]
        end_at: Option<String>,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_category")]
        category_id: Option<String>,
        /// Move the task out of its category
        #[arg(long)]
        clear_category: bool,
        #[arg(long)]
        scheduled_at: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        priority: Option<u8>,
        /// Set completed status
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Mark a task done
    Complete {
        /// Task ID
        id: String,
    },
    /// Start timing a task
    Start {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let Workspace { config, mut db } = Workspace::open()?;
    let user = config.local_user.as_str();
    let now = Utc::now();
    let mut service = TaskService::new(&mut db);

    match action {
        TaskAction::Create {
            title,
            description,
            category_id,
            scheduled_at,
            deadline,
            duration,
            priority,
        } => {
            let task = service.create(
                user,
                NewTask {
                    title,
                    description,
                    category_id,
                    scheduled_at,
                    deadline,
                    duration_minutes: duration,
                    priority,
                },
                now,
            )?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List {
            category_id,
            date,
            start_at,
            end_at,
        } => {
            let filter = TaskFilter::resolve(
                category_id,
                date.as_deref(),
                start_at.as_deref(),
                end_at.as_deref(),
            )?;
            print_json(&service.list(user, &filter)?)?;
        }
        TaskAction::Get { id } => {
            print_json(&service.get(user, &id)?)?;
        }
        TaskAction::Update {
            id,
            title,
            description,
            category_id,
            clear_category,
            scheduled_at,
            deadline,
            duration,
            priority,
            completed,
        } => {
            let patch = TaskPatch {
                title,
                description,
                category_id: if clear_category {
                    Some(None)
                } else {
                    category_id.map(Some)
                },
                scheduled_at,
                deadline,
                duration_minutes: duration.map(Some),
                priority,
                completed,
                timer_started_at: None,
            };
            let update = service.update(user, &id, &patch, now)?;
            print_json(&json!({
                "task": update.task,
                "xpDelta": update.xp_delta,
                "progress": update.progress,
            }))?;
        }
        TaskAction::Complete { id } => {
            let patch = TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            };
            let update = service.update(user, &id, &patch, now)?;
            tracing::info!(task_id = %id, xp_delta = update.xp_delta, "task marked done");
            print_json(&json!({
                "task": update.task,
                "xpDelta": update.xp_delta,
                "progress": update.progress,
            }))?;
        }
        TaskAction::Start { id } => {
            let patch = TaskPatch {
                timer_started_at: Some(Some(now.to_rfc3339())),
                ..TaskPatch::default()
            };
            let update = service.update(user, &id, &patch, now)?;
            print_json(&update.task)?;
        }
        TaskAction::Delete { id } => {
            service.delete(user, &id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
