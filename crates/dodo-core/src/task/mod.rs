//! One-off tasks with a schedule slot, a deadline and a priority.
//!
//! Completing a task awards XP once; reopening it takes that award back.

pub mod service;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates::{parse_date, parse_datetime};
use crate::error::ValidationError;

pub use service::TaskService;

pub const TITLE_MAX_CHARS: usize = 140;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const DURATION_MINUTES_RANGE: std::ops::RangeInclusive<u32> = 1..=1440;
pub const PRIORITY_RANGE: std::ops::RangeInclusive<u8> = 1..=3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    /// 1 (low) to 3 (high).
    pub priority: u8,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub timer_started_at: Option<DateTime<Utc>>,
    /// XP granted by the current completion, 0 while open.
    #[serde(skip)]
    pub xp_awarded: i64,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Timer minutes up to `now`, rounded to the nearest minute (at least 1).
    pub fn tracked_minutes(&self, now: DateTime<Utc>) -> Option<u32> {
        let started = self.timer_started_at?;
        let seconds = u64::try_from((now - started).num_seconds()).unwrap_or(0);
        if seconds == 0 {
            return None;
        }
        Some(u32::try_from(((seconds + 30) / 60).max(1)).unwrap_or(u32::MAX))
    }
}

/// Create payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub scheduled_at: String,
    pub deadline: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub priority: u8,
}

impl NewTask {
    pub fn into_task(self, user_id: &str, now: DateTime<Utc>) -> Result<Task, ValidationError> {
        let title = clean_title(&self.title)?;
        let description = clean_description(&self.description)?;
        let scheduled_at = parse_datetime(&self.scheduled_at, "scheduledAt")?;
        let deadline = parse_datetime(&self.deadline, "deadline")?;
        check_priority(self.priority)?;
        if let Some(minutes) = self.duration_minutes {
            check_duration(minutes)?;
        }
        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            description,
            category_id: self.category_id,
            scheduled_at,
            deadline,
            duration_minutes: self.duration_minutes,
            priority: self.priority,
            completed: false,
            completed_at: None,
            timer_started_at: None,
            xp_awarded: 0,
            created_at: now,
        })
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update. Nullable fields accept `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<String>>,
    pub scheduled_at: Option<String>,
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub duration_minutes: Option<Option<u32>>,
    pub priority: Option<u8>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub timer_started_at: Option<Option<String>>,
}

/// How a patch moved the completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionChange {
    Unchanged,
    Completed,
    Reopened,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.scheduled_at.is_none()
            && self.deadline.is_none()
            && self.duration_minutes.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.timer_started_at.is_none()
    }

    /// Validate every supplied field, then merge onto `task`.
    pub fn apply_to(
        &self,
        task: &mut Task,
        now: DateTime<Utc>,
    ) -> Result<CompletionChange, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }

        let title = self.title.as_deref().map(clean_title).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(clean_description)
            .transpose()?;
        let scheduled_at = self
            .scheduled_at
            .as_deref()
            .map(|v| parse_datetime(v, "scheduledAt"))
            .transpose()?;
        let deadline = self
            .deadline
            .as_deref()
            .map(|v| parse_datetime(v, "deadline"))
            .transpose()?;
        let timer_started_at = match &self.timer_started_at {
            Some(Some(v)) => Some(Some(parse_datetime(v, "timerStartedAt")?)),
            Some(None) => Some(None),
            None => None,
        };
        if let Some(priority) = self.priority {
            check_priority(priority)?;
        }
        if let Some(Some(minutes)) = self.duration_minutes {
            check_duration(minutes)?;
        }

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = description {
            task.description = description;
        }
        if let Some(category_id) = &self.category_id {
            task.category_id = category_id.clone();
        }
        if let Some(at) = scheduled_at {
            task.scheduled_at = at;
        }
        if let Some(at) = deadline {
            task.deadline = at;
        }
        if let Some(minutes) = self.duration_minutes {
            task.duration_minutes = minutes;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(at) = timer_started_at {
            task.timer_started_at = at;
        }

        let change = match self.completed {
            Some(true) if !task.completed => {
                task.completed = true;
                task.completed_at = Some(now);
                CompletionChange::Completed
            }
            Some(false) if task.completed => {
                task.completed = false;
                task.completed_at = None;
                CompletionChange::Reopened
            }
            _ => CompletionChange::Unchanged,
        };
        Ok(change)
    }
}

/// List filter: optional category plus at most one time window on
/// `scheduled_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub category_id: Option<String>,
    /// Half-open `[start, end)`.
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl TaskFilter {
    /// Build from raw query values. `date` selects one UTC day and cannot be
    /// combined with `start_at`/`end_at`, which must come together.
    pub fn resolve(
        category_id: Option<String>,
        date: Option<&str>,
        start_at: Option<&str>,
        end_at: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let has_range = start_at.is_some() || end_at.is_some();
        let window = match (date, start_at, end_at) {
            (Some(_), _, _) if has_range => return Err(ValidationError::ConflictingFilters),
            (Some(date), _, _) => Some(day_window(parse_date(date)?)),
            (None, Some(start), Some(end)) => {
                let start = parse_datetime(start, "startAt")?;
                let end = parse_datetime(end, "endAt")?;
                if end <= start {
                    return Err(ValidationError::InvertedTimeRange);
                }
                Some((start, end))
            }
            (None, None, None) => None,
            (None, _, _) => return Err(ValidationError::IncompleteTimeRange),
        };
        Ok(Self {
            category_id: category_id.filter(|c| !c.is_empty()),
            window,
        })
    }
}

fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

fn clean_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    let len = title.chars().count();
    if len == 0 || len > TITLE_MAX_CHARS {
        return Err(ValidationError::invalid(
            "title",
            format!("must be 1-{TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(title.to_string())
}

fn clean_description(raw: &str) -> Result<String, ValidationError> {
    let description = raw.trim();
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::invalid(
            "description",
            format!("must be at most {DESCRIPTION_MAX_CHARS} characters"),
        ));
    }
    Ok(description.to_string())
}

fn check_priority(priority: u8) -> Result<(), ValidationError> {
    if PRIORITY_RANGE.contains(&priority) {
        Ok(())
    } else {
        Err(ValidationError::invalid("priority", "must be between 1 and 3"))
    }
}

fn check_duration(minutes: u32) -> Result<(), ValidationError> {
    if DURATION_MINUTES_RANGE.contains(&minutes) {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            "durationMinutes",
            "must be between 1 and 1440",
        ))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn new_task(title: &str, priority: u8) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            category_id: None,
            scheduled_at: "2024-03-01T09:00:00Z".to_string(),
            deadline: "2024-03-01T17:00:00Z".to_string(),
            duration_minutes: None,
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::new_task;
    use super::*;

    fn now() -> DateTime<Utc> {
        parse_datetime("2024-03-01T08:00:00Z", "now").unwrap()
    }

    #[test]
    fn new_task_trims_and_validates() {
        let mut input = new_task("  Write report ", 2);
        input.description = "  draft first ".to_string();
        let task = input.into_task("u1", now()).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.description, "draft first");
        assert!(!task.completed);

        assert!(new_task("   ", 2).into_task("u1", now()).is_err());
        assert!(new_task("x", 4).into_task("u1", now()).is_err());

        let mut bad_time = new_task("x", 1);
        bad_time.deadline = "tomorrow".to_string();
        assert_eq!(
            bad_time.into_task("u1", now()),
            Err(ValidationError::InvalidDateTime { field: "deadline" })
        );
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let mut task = new_task("x", 1).into_task("u1", now()).unwrap();
        task.category_id = Some("c1".to_string());
        task.duration_minutes = Some(30);

        let keep: TaskPatch = serde_json::from_str(r#"{"priority": 3}"#).unwrap();
        keep.apply_to(&mut task, now()).unwrap();
        assert_eq!(task.category_id.as_deref(), Some("c1"));
        assert_eq!(task.priority, 3);

        let clear: TaskPatch =
            serde_json::from_str(r#"{"categoryId": null, "durationMinutes": null}"#).unwrap();
        clear.apply_to(&mut task, now()).unwrap();
        assert_eq!(task.category_id, None);
        assert_eq!(task.duration_minutes, None);
    }

    #[test]
    fn patch_tracks_completion_transitions() {
        let mut task = new_task("x", 1).into_task("u1", now()).unwrap();
        let complete = TaskPatch { completed: Some(true), ..Default::default() };
        let reopen = TaskPatch { completed: Some(false), ..Default::default() };

        assert_eq!(complete.apply_to(&mut task, now()).unwrap(), CompletionChange::Completed);
        assert_eq!(task.completed_at, Some(now()));
        assert_eq!(complete.apply_to(&mut task, now()).unwrap(), CompletionChange::Unchanged);
        assert_eq!(reopen.apply_to(&mut task, now()).unwrap(), CompletionChange::Reopened);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn empty_or_invalid_patch_leaves_task_untouched() {
        let mut task = new_task("x", 1).into_task("u1", now()).unwrap();
        let before = task.clone();
        assert_eq!(
            TaskPatch::default().apply_to(&mut task, now()),
            Err(ValidationError::EmptyPatch)
        );
        let bad = TaskPatch {
            title: Some("renamed".to_string()),
            priority: Some(9),
            ..Default::default()
        };
        assert!(bad.apply_to(&mut task, now()).is_err());
        assert_eq!(task, before);
    }

    #[test]
    fn filter_resolution() {
        let by_day = TaskFilter::resolve(None, Some("2024-03-01"), None, None).unwrap();
        let (start, end) = by_day.window.unwrap();
        assert_eq!(end - start, chrono::Duration::days(1));

        assert_eq!(
            TaskFilter::resolve(None, Some("2024-03-01"), Some("2024-03-01T00:00:00Z"), None),
            Err(ValidationError::ConflictingFilters)
        );
        assert_eq!(
            TaskFilter::resolve(None, None, Some("2024-03-01T00:00:00Z"), None),
            Err(ValidationError::IncompleteTimeRange)
        );
        assert_eq!(
            TaskFilter::resolve(
                None,
                None,
                Some("2024-03-02T00:00:00Z"),
                Some("2024-03-02T00:00:00Z")
            ),
            Err(ValidationError::InvertedTimeRange)
        );
        assert_eq!(TaskFilter::resolve(Some(String::new()), None, None, None).unwrap(), TaskFilter::default());
    }

    #[test]
    fn tracked_minutes_from_timer() {
        let mut task = new_task("x", 1).into_task("u1", now()).unwrap();
        assert_eq!(task.tracked_minutes(now()), None);
        task.timer_started_at = Some(now());
        assert_eq!(task.tracked_minutes(now() + chrono::Duration::seconds(10)), Some(1));
        assert_eq!(task.tracked_minutes(now() + chrono::Duration::seconds(150)), Some(3));
    }
}
