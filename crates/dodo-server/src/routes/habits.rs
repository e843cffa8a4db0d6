use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use dodo_core::dates::today_utc;
use dodo_core::{
    CompletionLedger, CompletionOutcome, HabitPatch, HabitService, HabitView, HistoryEntry,
    HistoryRange, NewHabit, Progress, TimerOutcome,
};

use crate::error::ApiError;
use crate::extract::{day_or_today, non_empty, CurrentUser, DateBody, Payload, QueryParams};
use crate::SharedState;

#[derive(Serialize)]
pub struct HabitList {
    habits: Vec<HabitView>,
}

#[derive(Serialize)]
pub struct HabitEnvelope {
    habit: HabitView,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionBody {
    habit_id: String,
    date: NaiveDate,
    completed: bool,
    xp_delta: i64,
}

#[derive(Serialize)]
pub struct CompletionResponse {
    habit: HabitView,
    completion: CompletionBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<Progress>,
}

impl From<CompletionOutcome> for CompletionResponse {
    fn from(outcome: CompletionOutcome) -> Self {
        Self {
            habit: HabitView::new(&outcome.habit, outcome.session.as_ref()),
            completion: CompletionBody {
                habit_id: outcome.habit.id.clone(),
                date: outcome.date,
                completed: outcome.completed,
                xp_delta: outcome.xp_delta,
            },
            progress: outcome.progress,
        }
    }
}

impl From<TimerOutcome> for HabitEnvelope {
    fn from(outcome: TimerOutcome) -> Self {
        Self {
            habit: HabitView::new(&outcome.habit, outcome.session.as_ref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    habit_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

pub async fn list_habits(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<HabitList>, ApiError> {
    let lookahead = state.lookahead_days();
    let habits = state
        .run_db(move |db| {
            HabitService::new(db)
                .with_lookahead(lookahead)
                .list(&user_id, Utc::now())
        })
        .await?;
    Ok(Json(HabitList { habits }))
}

pub async fn create_habit(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Payload(input): Payload<NewHabit>,
) -> Result<(StatusCode, Json<HabitEnvelope>), ApiError> {
    let lookahead = state.lookahead_days();
    let habit = state
        .run_db(move |db| {
            let now = Utc::now();
            let mut service = HabitService::new(db).with_lookahead(lookahead);
            let habit = service.create(&user_id, input, now)?;
            service.view(&habit, now)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(HabitEnvelope { habit })))
}

pub async fn update_habit(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(habit_id): Path<String>,
    Payload(patch): Payload<HabitPatch>,
) -> Result<Json<HabitEnvelope>, ApiError> {
    let lookahead = state.lookahead_days();
    let habit = state
        .run_db(move |db| {
            let now = Utc::now();
            let mut service = HabitService::new(db).with_lookahead(lookahead);
            let habit = service.update(&user_id, &habit_id, &patch, now)?;
            service.view(&habit, now)
        })
        .await?;
    Ok(Json(HabitEnvelope { habit }))
}

pub async fn delete_habit(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(habit_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .run_db(move |db| HabitService::new(db).delete(&user_id, &habit_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn habit_history(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    QueryParams(query): QueryParams<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let today = today_utc(Utc::now());
    let days = query
        .days
        .unwrap_or(state.config.habits.history_default_days);
    let range = HistoryRange::resolve(
        non_empty(&query.start_date),
        non_empty(&query.end_date),
        Some(days),
        today,
    )
    .map_err(dodo_core::CoreError::from)?;
    let habit_id = non_empty(&query.habit_id).map(str::to_string);

    let history = state
        .run_db(move |db| CompletionLedger::new(db).history(&user_id, habit_id.as_deref(), range))
        .await?;
    Ok(Json(HistoryResponse { history }))
}

/// `POST /api/habits/{id}/complete` with an optional `{ "date": ... }` body.
pub async fn complete_habit(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(habit_id): Path<String>,
    body: Bytes,
) -> Result<Json<CompletionResponse>, ApiError> {
    let now = Utc::now();
    let body = DateBody::parse(&body)?;
    let day = day_or_today(body.date.as_deref(), today_utc(now))?;

    let lookahead = state.lookahead_days();
    let outcome = state
        .run_db(move |db| {
            CompletionLedger::new(db)
                .with_lookahead(lookahead)
                .complete(&user_id, &habit_id, day, now)
        })
        .await?;
    Ok(Json(outcome.into()))
}

/// `DELETE /api/habits/{id}/complete?date=YYYY-MM-DD`.
pub async fn uncomplete_habit(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(habit_id): Path<String>,
    QueryParams(query): QueryParams<DateQuery>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let now = Utc::now();
    let day = day_or_today(query.date.as_deref(), today_utc(now))?;

    let lookahead = state.lookahead_days();
    let outcome = state
        .run_db(move |db| {
            CompletionLedger::new(db)
                .with_lookahead(lookahead)
                .uncomplete(&user_id, &habit_id, day, now)
        })
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn start_timer(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(habit_id): Path<String>,
    body: Bytes,
) -> Result<Json<HabitEnvelope>, ApiError> {
    let now = Utc::now();
    let body = DateBody::parse(&body)?;
    let day = day_or_today(body.date.as_deref(), today_utc(now))?;

    let outcome = state
        .run_db(move |db| CompletionLedger::new(db).start_timer(&user_id, &habit_id, day, now))
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn pause_timer(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(habit_id): Path<String>,
    body: Bytes,
) -> Result<Json<HabitEnvelope>, ApiError> {
    let now = Utc::now();
    let body = DateBody::parse(&body)?;
    let day = day_or_today(body.date.as_deref(), today_utc(now))?;

    let outcome = state
        .run_db(move |db| CompletionLedger::new(db).pause_timer(&user_id, &habit_id, day, now))
        .await?;
    Ok(Json(outcome.into()))
}
