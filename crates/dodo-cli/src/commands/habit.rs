//! Habit commands.

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use dodo_core::dates::today_utc;
use dodo_core::{
    CompletionLedger, FrequencyType, HabitPatch, HabitService, HabitView, HistoryRange, NewHabit,
};

use super::{day_arg, print_json, Workspace};

#[derive(Subcommand)]
pub enum HabitAction {
    /// List habits with today's timer state
    List,
    /// Create a habit anchored on today
    Create {
        /// Habit title
        title: String,
        /// daily, interval or custom_days
        #[arg(long, default_value = "daily")]
        frequency: String,
        /// Days between occurrences (interval habits)
        #[arg(long)]
        interval_days: Option<u32>,
        /// Comma-separated weekdays, 0 = Sunday (custom_days habits)
        #[arg(long, value_delimiter = ',')]
        days: Vec<i64>,
        /// Minute of the day, 0-1439
        #[arg(long)]
        time_minute: Option<u16>,
        /// Planned minutes
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Update a habit; streaks are rebuilt under the new rule
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long)]
        interval_days: Option<u32>,
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<i64>>,
        #[arg(long)]
        time_minute: Option<u16>,
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Delete a habit and its history
    Delete { id: String },
    /// Mark a habit done (default: today)
    Complete {
        id: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove a completion (default: today)
    Uncomplete {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Start or resume the day's timer
    Start {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Pause the day's timer
    Pause {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Completed days in a window
    History {
        /// Limit to one habit
        #[arg(long)]
        habit: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Days ending today when no start/end is given
        #[arg(long)]
        days: Option<u32>,
    },
}

fn frequency(raw: &str) -> Result<FrequencyType, String> {
    FrequencyType::parse(raw)
        .ok_or_else(|| format!("unknown frequency '{raw}' (daily, interval, custom_days)"))
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let Workspace { config, mut db } = Workspace::open()?;
    let user = config.local_user.as_str();
    let lookahead = config.habits.max_lookahead_days;
    let now = Utc::now();
    let today = today_utc(now);

    match action {
        HabitAction::List => {
            let habits = HabitService::new(&mut db)
                .with_lookahead(lookahead)
                .list(user, now)?;
            print_json(&habits)?;
        }
        HabitAction::Create {
            title,
            frequency: kind,
            interval_days,
            days,
            time_minute,
            duration,
        } => {
            let input = NewHabit {
                title,
                frequency_type: frequency(&kind)?,
                interval_days,
                custom_days: days,
                time_minute,
                duration_minutes: duration,
            };
            let mut service = HabitService::new(&mut db).with_lookahead(lookahead);
            let habit = service.create(user, input, now)?;
            print_json(&service.view(&habit, now)?)?;
        }
        HabitAction::Update {
            id,
            title,
            frequency: kind,
            interval_days,
            days,
            time_minute,
            duration,
        } => {
            let patch = HabitPatch {
                title,
                frequency_type: kind.as_deref().map(frequency).transpose()?,
                interval_days,
                custom_days: days,
                time_minute,
                duration_minutes: duration,
            };
            let mut service = HabitService::new(&mut db).with_lookahead(lookahead);
            let habit = service.update(user, &id, &patch, now)?;
            print_json(&service.view(&habit, now)?)?;
        }
        HabitAction::Delete { id } => {
            HabitService::new(&mut db).delete(user, &id)?;
            tracing::info!(habit_id = %id, "habit deleted");
            println!("Habit deleted: {id}");
        }
        HabitAction::Complete { id, date } => {
            let day = day_arg(date.as_deref(), today)?;
            let outcome = CompletionLedger::new(&mut db)
                .with_lookahead(lookahead)
                .complete(user, &id, day, now)?;
            tracing::info!(habit_id = %id, %day, xp_delta = outcome.xp_delta, "habit marked done");
            print_json(&json!({
                "habit": HabitView::new(&outcome.habit, outcome.session.as_ref()),
                "date": outcome.date,
                "xpDelta": outcome.xp_delta,
                "progress": outcome.progress,
            }))?;
        }
        HabitAction::Uncomplete { id, date } => {
            let day = day_arg(date.as_deref(), today)?;
            let outcome = CompletionLedger::new(&mut db)
                .with_lookahead(lookahead)
                .uncomplete(user, &id, day, now)?;
            tracing::info!(habit_id = %id, %day, xp_delta = outcome.xp_delta, "habit marked not done");
            print_json(&json!({
                "habit": HabitView::new(&outcome.habit, outcome.session.as_ref()),
                "date": outcome.date,
                "xpDelta": outcome.xp_delta,
                "progress": outcome.progress,
            }))?;
        }
        HabitAction::Start { id, date } => {
            let day = day_arg(date.as_deref(), today)?;
            let outcome = CompletionLedger::new(&mut db).start_timer(user, &id, day, now)?;
            print_json(&HabitView::new(&outcome.habit, outcome.session.as_ref()))?;
        }
        HabitAction::Pause { id, date } => {
            let day = day_arg(date.as_deref(), today)?;
            let outcome = CompletionLedger::new(&mut db).pause_timer(user, &id, day, now)?;
            print_json(&HabitView::new(&outcome.habit, outcome.session.as_ref()))?;
        }
        HabitAction::History {
            habit,
            start,
            end,
            days,
        } => {
            let days = days.unwrap_or(config.habits.history_default_days);
            let range =
                HistoryRange::resolve(start.as_deref(), end.as_deref(), Some(days), today)?;
            let history = CompletionLedger::new(&mut db).history(user, habit.as_deref(), range)?;
            print_json(&history)?;
        }
    }
    Ok(())
}
