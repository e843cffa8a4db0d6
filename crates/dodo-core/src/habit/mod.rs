//! Habits: recurrence rules, streak bookkeeping and the completion ledger.
//!
//! The pure engine lives in [`recurrence`], [`forecast`] and [`streak`];
//! [`ledger`] and [`service`] drive it against the store.

pub mod forecast;
pub mod ledger;
pub mod recurrence;
pub mod service;
pub mod session;
pub mod streak;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use forecast::{next_applicable, DEFAULT_LOOKAHEAD_DAYS};
pub use ledger::{CompletionLedger, CompletionOutcome, HistoryEntry, HistoryRange, TimerOutcome};
pub use recurrence::{applies, HabitSchedule};
pub use service::HabitService;
pub use session::HabitSession;
pub use streak::{recompute, DerivedState, StreakSummary};

pub const TITLE_MAX_CHARS: usize = 100;
pub const INTERVAL_DAYS_RANGE: std::ops::RangeInclusive<u32> = 2..=365;
pub const TIME_MINUTE_MAX: u16 = 1439;
pub const DURATION_MINUTES_RANGE: std::ops::RangeInclusive<u32> = 1..=720;

/// Recurrence family as exposed over the API and stored in `frequency_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyType {
    #[default]
    Daily,
    Interval,
    CustomDays,
}

impl FrequencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyType::Daily => "daily",
            FrequencyType::Interval => "interval",
            FrequencyType::CustomDays => "custom_days",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(FrequencyType::Daily),
            "interval" => Some(FrequencyType::Interval),
            "custom_days" => Some(FrequencyType::CustomDays),
            _ => None,
        }
    }
}

/// Set of Sunday-first weekdays (bit 0 = Sunday .. bit 6 = Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    /// Build from raw day numbers, dropping anything outside 0..=6.
    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<i64>,
    {
        let mut bits = 0u8;
        for day in days {
            let day: i64 = day.into();
            if (0..=6).contains(&day) {
                bits |= 1 << day;
            }
        }
        WeekdaySet(bits)
    }

    pub fn contains(&self, weekday: u8) -> bool {
        weekday < 7 && self.0 & (1 << weekday) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Sorted day numbers.
    pub fn days(&self) -> Vec<u8> {
        (0..7).filter(|d| self.contains(*d)).collect()
    }
}

/// Which calendar days a habit is due on.
///
/// Only the parameter that matters for the kind is carried, so an interval
/// habit can never hold a stale weekday set and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    Interval { days: u32 },
    CustomDays(WeekdaySet),
}

impl Recurrence {
    pub fn frequency_type(&self) -> FrequencyType {
        match self {
            Recurrence::Daily => FrequencyType::Daily,
            Recurrence::Interval { .. } => FrequencyType::Interval,
            Recurrence::CustomDays(_) => FrequencyType::CustomDays,
        }
    }

    pub fn interval_days(&self) -> Option<u32> {
        match self {
            Recurrence::Interval { days } => Some(*days),
            Recurrence::Daily | Recurrence::CustomDays(_) => None,
        }
    }

    pub fn custom_days(&self) -> Vec<u8> {
        match self {
            Recurrence::CustomDays(set) => set.days(),
            Recurrence::Daily | Recurrence::Interval { .. } => Vec::new(),
        }
    }

    /// Validate the parameters for `kind` and clear the ones it does not use.
    pub fn resolve(
        kind: FrequencyType,
        interval_days: Option<u32>,
        custom_days: WeekdaySet,
    ) -> Result<Self, ValidationError> {
        match kind {
            FrequencyType::Daily => Ok(Recurrence::Daily),
            FrequencyType::Interval => {
                let days = interval_days.ok_or(ValidationError::MissingInterval)?;
                check_interval(days)?;
                Ok(Recurrence::Interval { days })
            }
            FrequencyType::CustomDays => {
                if custom_days.is_empty() {
                    return Err(ValidationError::MissingCustomDays);
                }
                Ok(Recurrence::CustomDays(custom_days))
            }
        }
    }
}

/// A recurring habit owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub recurrence: Recurrence,
    /// The habit never applies before this day.
    pub anchor_date: NaiveDate,
    pub time_minute: Option<u16>,
    pub duration_minutes: Option<u32>,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_completed_on: Option<NaiveDate>,
    pub next_occurrence_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    pub fn schedule(&self) -> HabitSchedule {
        HabitSchedule::new(self.recurrence, self.anchor_date)
    }

    pub fn apply_derived(&mut self, derived: &DerivedState) {
        self.current_streak = derived.streak.current;
        self.best_streak = derived.streak.best;
        self.last_completed_on = derived.streak.last_completed;
        self.next_occurrence_on = derived.next_occurrence_on;
    }
}

/// One recorded completion of a habit on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitCompletion {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub completed_on: NaiveDate,
    pub completed_at: DateTime<Utc>,
    /// Fixed when the row is first recorded; reversed on uncomplete.
    pub xp_awarded: i64,
    pub actual_minutes: Option<u32>,
}

/// Create payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub title: String,
    #[serde(default)]
    pub frequency_type: FrequencyType,
    #[serde(default)]
    pub interval_days: Option<u32>,
    #[serde(default)]
    pub custom_days: Vec<i64>,
    #[serde(default)]
    pub time_minute: Option<u16>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// Partial update; every field is optional and absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    pub title: Option<String>,
    pub frequency_type: Option<FrequencyType>,
    pub interval_days: Option<u32>,
    pub custom_days: Option<Vec<i64>>,
    pub time_minute: Option<u16>,
    pub duration_minutes: Option<u32>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.frequency_type.is_none()
            && self.interval_days.is_none()
            && self.custom_days.is_none()
            && self.time_minute.is_none()
            && self.duration_minutes.is_none()
    }

    /// Merge onto `habit` after validating every supplied field.
    pub fn apply_to(&self, habit: &mut Habit) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(days) = self.interval_days {
            check_interval(days)?;
        }

        let kind = self
            .frequency_type
            .unwrap_or_else(|| habit.recurrence.frequency_type());
        let interval = self
            .interval_days
            .or_else(|| habit.recurrence.interval_days());
        let weekdays = match &self.custom_days {
            Some(days) => WeekdaySet::from_days(days.iter().copied()),
            None => WeekdaySet::from_days(habit.recurrence.custom_days()),
        };
        let recurrence = Recurrence::resolve(kind, interval, weekdays)?;

        if let Some(title) = &self.title {
            habit.title = clean_title(title)?;
        }
        if let Some(minute) = self.time_minute {
            check_time_minute(minute)?;
            habit.time_minute = Some(minute);
        }
        if let Some(minutes) = self.duration_minutes {
            check_duration(minutes)?;
            habit.duration_minutes = Some(minutes);
        }
        habit.recurrence = recurrence;
        Ok(())
    }
}

impl NewHabit {
    /// Validate and build a habit anchored on `today`.
    pub fn into_habit(
        self,
        user_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Habit, ValidationError> {
        let title = clean_title(&self.title)?;
        let recurrence = Recurrence::resolve(
            self.frequency_type,
            self.interval_days,
            WeekdaySet::from_days(self.custom_days.iter().copied()),
        )?;
        if let Some(minute) = self.time_minute {
            check_time_minute(minute)?;
        }
        if let Some(minutes) = self.duration_minutes {
            check_duration(minutes)?;
        }
        Ok(Habit {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            recurrence,
            anchor_date: today,
            time_minute: self.time_minute,
            duration_minutes: self.duration_minutes,
            current_streak: 0,
            best_streak: 0,
            last_completed_on: None,
            next_occurrence_on: None,
            created_at: now,
        })
    }
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

fn check_interval(days: u32) -> Result<(), ValidationError> {
    if INTERVAL_DAYS_RANGE.contains(&days) {
        Ok(())
    } else {
        Err(ValidationError::invalid("intervalDays", "must be between 2 and 365"))
    }
}

fn check_time_minute(minute: u16) -> Result<(), ValidationError> {
    if minute <= TIME_MINUTE_MAX {
        Ok(())
    } else {
        Err(ValidationError::invalid("timeMinute", "must be between 0 and 1439"))
    }
}

fn check_duration(minutes: u32) -> Result<(), ValidationError> {
    if DURATION_MINUTES_RANGE.contains(&minutes) {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            "durationMinutes",
            "must be between 1 and 720",
        ))
    }
}

/// API representation of a habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitView {
    pub id: String,
    pub title: String,
    pub frequency_type: FrequencyType,
    pub interval_days: Option<u32>,
    pub custom_days: Vec<u8>,
    pub anchor_date: NaiveDate,
    pub time_minute: Option<u16>,
    pub duration_minutes: Option<u32>,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_completed_on: Option<NaiveDate>,
    pub next_occurrence_on: Option<NaiveDate>,
    /// Start of the running timer segment for the requested day, if any.
    pub timer_started_at: Option<DateTime<Utc>>,
    /// Seconds already banked by paused timer segments.
    pub tracked_seconds: u64,
    pub created_at: DateTime<Utc>,
}

impl HabitView {
    pub fn new(habit: &Habit, session: Option<&HabitSession>) -> Self {
        Self {
            id: habit.id.clone(),
            title: habit.title.clone(),
            frequency_type: habit.recurrence.frequency_type(),
            interval_days: habit.recurrence.interval_days(),
            custom_days: habit.recurrence.custom_days(),
            anchor_date: habit.anchor_date,
            time_minute: habit.time_minute,
            duration_minutes: habit.duration_minutes,
            current_streak: habit.current_streak,
            best_streak: habit.best_streak,
            last_completed_on: habit.last_completed_on,
            next_occurrence_on: habit.next_occurrence_on,
            timer_started_at: session.filter(|s| s.is_running()).map(|s| s.started_at),
            tracked_seconds: session.map(|s| s.accumulated_seconds).unwrap_or(0),
            created_at: habit.created_at,
        }
    }
}
