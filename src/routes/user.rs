// SPDX-License-Identifier: MIT

//! User lookup route.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::DisplayUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/user/{user_id}", get(get_user))
}

/// Get a user's display profile from the stored identity record.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<DisplayUser>> {
    let record = state
        .users
        .read(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let is_admin = state.config.admins.contains(&user_id);
    Ok(Json(DisplayUser::from_profile(record.profile, is_admin)))
}
