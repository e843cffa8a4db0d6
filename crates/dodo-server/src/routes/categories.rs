use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use dodo_core::{Category, CategoryPatch, CategoryService, NewCategory};

use crate::error::ApiError;
use crate::extract::{CurrentUser, Payload};
use crate::SharedState;

#[derive(Serialize)]
pub struct CategoryList {
    categories: Vec<Category>,
}

#[derive(Serialize)]
pub struct CategoryEnvelope {
    category: Category,
}

pub async fn list_categories(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CategoryList>, ApiError> {
    let categories = state
        .run_db(move |db| CategoryService::new(db).list(&user_id))
        .await?;
    Ok(Json(CategoryList { categories }))
}

pub async fn create_category(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Payload(input): Payload<NewCategory>,
) -> Result<(StatusCode, Json<CategoryEnvelope>), ApiError> {
    let category = state
        .run_db(move |db| CategoryService::new(db).create(&user_id, input, Utc::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryEnvelope { category })))
}

pub async fn update_category(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(category_id): Path<String>,
    Payload(patch): Payload<CategoryPatch>,
) -> Result<Json<CategoryEnvelope>, ApiError> {
    let category = state
        .run_db(move |db| CategoryService::new(db).update(&user_id, &category_id, &patch))
        .await?;
    Ok(Json(CategoryEnvelope { category }))
}

pub async fn delete_category(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(category_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .run_db(move |db| CategoryService::new(db).delete(&user_id, &category_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
