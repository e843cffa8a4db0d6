use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use dodo_core::{CoreError, NewTask, Progress, Task, TaskFilter, TaskPatch, TaskService};

use crate::error::ApiError;
use crate::extract::{non_empty, CurrentUser, Payload, QueryParams};
use crate::SharedState;

#[derive(Serialize)]
pub struct TaskList {
    tasks: Vec<Task>,
}

#[derive(Serialize)]
pub struct TaskEnvelope {
    task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<Progress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    category_id: Option<String>,
    date: Option<String>,
    start_at: Option<String>,
    end_at: Option<String>,
}

pub async fn list_tasks(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    QueryParams(query): QueryParams<TaskQuery>,
) -> Result<Json<TaskList>, ApiError> {
    let filter = TaskFilter::resolve(
        non_empty(&query.category_id).map(str::to_string),
        non_empty(&query.date),
        non_empty(&query.start_at),
        non_empty(&query.end_at),
    )
    .map_err(CoreError::from)?;

    let tasks = state
        .run_db(move |db| TaskService::new(db).list(&user_id, &filter))
        .await?;
    Ok(Json(TaskList { tasks }))
}

pub async fn create_task(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Payload(input): Payload<NewTask>,
) -> Result<(StatusCode, Json<TaskEnvelope>), ApiError> {
    let task = state
        .run_db(move |db| TaskService::new(db).create(&user_id, input, Utc::now()))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskEnvelope {
            task,
            progress: None,
        }),
    ))
}

/// Partial update; toggling `completed` also returns the new profile
/// progress.
pub async fn update_task(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(task_id): Path<String>,
    Payload(patch): Payload<TaskPatch>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let update = state
        .run_db(move |db| TaskService::new(db).update(&user_id, &task_id, &patch, Utc::now()))
        .await?;
    Ok(Json(TaskEnvelope {
        task: update.task,
        progress: update.progress,
    }))
}

pub async fn delete_task(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .run_db(move |db| TaskService::new(db).delete(&user_id, &task_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
