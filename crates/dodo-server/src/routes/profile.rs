use axum::extract::State;
use axum::Json;
use serde::Serialize;

use dodo_core::storage::profile::load_progress;
use dodo_core::Progress;

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::SharedState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    user_id: String,
    #[serde(flatten)]
    progress: Progress,
}

pub async fn get_profile(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let owner = user_id.clone();
    let progress = state
        .run_db(move |db| load_progress(db.conn(), &owner))
        .await?;
    Ok(Json(ProfileResponse { user_id, progress }))
}
