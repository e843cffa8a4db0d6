//! Habit CRUD on top of the store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{DerivedState, Habit, HabitPatch, HabitView, NewHabit, DEFAULT_LOOKAHEAD_DAYS};
use crate::dates::today_utc;
use crate::error::{CoreError, Result};
use crate::storage::{habits as store, Database};

pub struct HabitService<'a> {
    db: &'a mut Database,
    lookahead_days: u32,
}

impl<'a> HabitService<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self {
            db,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }

    pub fn with_lookahead(mut self, days: u32) -> Self {
        self.lookahead_days = days;
        self
    }

    /// Validate and store a new habit anchored on today (UTC).
    pub fn create(&mut self, user_id: &str, input: NewHabit, now: DateTime<Utc>) -> Result<Habit> {
        let today = today_utc(now);
        let mut habit = input.into_habit(user_id, today, now)?;
        let derived =
            DerivedState::compute(&habit.schedule(), &BTreeSet::new(), today, self.lookahead_days);
        habit.apply_derived(&derived);

        store::insert_habit(self.db.conn(), &habit)?;
        tracing::info!(user_id, habit_id = %habit.id, kind = habit.recurrence.frequency_type().as_str(), "habit created");
        Ok(habit)
    }

    /// Apply a partial update, then rebuild streaks against the new rule.
    pub fn update(
        &mut self,
        user_id: &str,
        habit_id: &str,
        patch: &HabitPatch,
        now: DateTime<Utc>,
    ) -> Result<Habit> {
        let lookahead = self.lookahead_days;
        let tx = self.db.write_tx()?;

        let mut habit = store::get_habit(&tx, user_id, habit_id)?
            .ok_or_else(|| CoreError::not_found("Habit", habit_id))?;
        patch.apply_to(&mut habit)?;

        let completed = store::completed_days(&tx, user_id, habit_id)?;
        let derived = DerivedState::compute(&habit.schedule(), &completed, today_utc(now), lookahead);
        habit.apply_derived(&derived);
        store::save_habit(&tx, &habit)?;
        tx.commit()?;

        tracing::info!(user_id, habit_id, "habit updated");
        Ok(habit)
    }

    pub fn delete(&mut self, user_id: &str, habit_id: &str) -> Result<()> {
        if !store::delete_habit(self.db.conn(), user_id, habit_id)? {
            return Err(CoreError::not_found("Habit", habit_id));
        }
        tracing::info!(user_id, habit_id, "habit deleted");
        Ok(())
    }

    pub fn get(&self, user_id: &str, habit_id: &str) -> Result<Habit> {
        store::get_habit(self.db.conn(), user_id, habit_id)?
            .ok_or_else(|| CoreError::not_found("Habit", habit_id))
    }

    /// All habits, oldest first, with today's timer state.
    pub fn list(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<HabitView>> {
        let conn = self.db.conn();
        let habits = store::list_habits(conn, user_id)?;
        let sessions = store::sessions_on(conn, user_id, today_utc(now))?;
        Ok(habits
            .iter()
            .map(|habit| {
                let session = sessions.iter().find(|s| s.habit_id == habit.id);
                HabitView::new(habit, session)
            })
            .collect())
    }

    /// View of one habit with today's timer state.
    pub fn view(&self, habit: &Habit, now: DateTime<Utc>) -> Result<HabitView> {
        let session =
            store::find_session(self.db.conn(), &habit.user_id, &habit.id, today_utc(now))?;
        Ok(HabitView::new(habit, session.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::habit::test_support::day;
    use crate::habit::{CompletionLedger, FrequencyType, Recurrence, WeekdaySet};

    fn now() -> DateTime<Utc> {
        // Friday
        day(2024, 3, 1).and_hms_opt(9, 30, 0).unwrap().and_utc()
    }

    fn weekly(days: Vec<i64>) -> NewHabit {
        NewHabit {
            title: "  Long run  ".to_string(),
            frequency_type: FrequencyType::CustomDays,
            custom_days: days,
            ..Default::default()
        }
    }

    #[test]
    fn create_anchors_today_and_forecasts() {
        let mut db = Database::open_memory().unwrap();
        let mut service = HabitService::new(&mut db);

        let habit = service.create("u1", weekly(vec![0, 9, 0, -1]), now()).unwrap();
        assert_eq!(habit.title, "Long run");
        assert_eq!(habit.anchor_date, day(2024, 3, 1));
        assert_eq!(habit.recurrence, Recurrence::CustomDays(WeekdaySet::from_days([0i64])));
        // next Sunday
        assert_eq!(habit.next_occurrence_on, Some(day(2024, 3, 3)));
        assert_eq!(service.get("u1", &habit.id).unwrap(), habit);
    }

    #[test]
    fn create_rejects_bad_rules() {
        let mut db = Database::open_memory().unwrap();
        let mut service = HabitService::new(&mut db);

        let err = service.create("u1", weekly(vec![7, 8]), now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::MissingCustomDays)));

        let interval = NewHabit {
            title: "Water plants".to_string(),
            frequency_type: FrequencyType::Interval,
            ..Default::default()
        };
        let err = service.create("u1", interval, now()).unwrap_err();
        assert_eq!(err.to_string(), "intervalDays is required for interval habits.");
    }

    #[test]
    fn update_switches_kind_and_recomputes() {
        let mut db = Database::open_memory().unwrap();
        let habit = HabitService::new(&mut db)
            .create("u1", NewHabit { title: "Read".into(), ..Default::default() }, now())
            .unwrap();

        let later = now() + chrono::Duration::days(1);
        CompletionLedger::new(&mut db)
            .complete("u1", &habit.id, day(2024, 3, 2), later)
            .unwrap();

        // 2024-03-02 is a Saturday, which the new rule does not cover
        let patch = HabitPatch {
            frequency_type: Some(FrequencyType::CustomDays),
            custom_days: Some(vec![1, 3, 5]),
            ..Default::default()
        };
        let updated = HabitService::new(&mut db)
            .update("u1", &habit.id, &patch, later)
            .unwrap();
        assert_eq!(updated.recurrence.interval_days(), None);
        assert_eq!(updated.recurrence.custom_days(), vec![1, 3, 5]);
        assert_eq!(updated.current_streak, 0);
        assert_eq!(updated.best_streak, 0);
        assert_eq!(updated.next_occurrence_on, Some(day(2024, 3, 4)));
    }

    #[test]
    fn update_requires_a_field() {
        let mut db = Database::open_memory().unwrap();
        let mut service = HabitService::new(&mut db);
        let habit = service
            .create("u1", NewHabit { title: "Read".into(), ..Default::default() }, now())
            .unwrap();
        let err = service
            .update("u1", &habit.id, &HabitPatch::default(), now())
            .unwrap_err();
        assert_eq!(err.to_string(), "At least one field is required.");
    }

    #[test]
    fn delete_and_list_are_scoped() {
        let mut db = Database::open_memory().unwrap();
        let mut service = HabitService::new(&mut db);
        let a = service
            .create("u1", NewHabit { title: "A".into(), ..Default::default() }, now())
            .unwrap();
        service
            .create("u1", NewHabit { title: "B".into(), ..Default::default() }, now())
            .unwrap();

        assert!(matches!(
            service.delete("u2", &a.id),
            Err(CoreError::NotFound { .. })
        ));
        service.delete("u1", &a.id).unwrap();

        let views = service.list("u1", now()).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].title, "B");
        assert!(service.list("u2", now()).unwrap().is_empty());
    }

    #[test]
    fn list_reports_running_timer() {
        let mut db = Database::open_memory().unwrap();
        let habit = HabitService::new(&mut db)
            .create("u1", NewHabit { title: "Meditate".into(), ..Default::default() }, now())
            .unwrap();
        CompletionLedger::new(&mut db)
            .start_timer("u1", &habit.id, day(2024, 3, 1), now())
            .unwrap();

        let views = HabitService::new(&mut db).list("u1", now()).unwrap();
        assert_eq!(views[0].timer_started_at, Some(now()));
    }
}
