use crate::db;
use crate::domain::models::{Caller, UserProfile};
use crate::error::{AppError, AppResult};
use crate::state::{AppState, SharedState};
use axum::{extract::State, routing::get, Json, Router};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(get_profile).put(put_profile))
        .with_state(state)
}

/// Stored profile of a user; unreadable rows are treated as empty.
pub(crate) async fn load_profile(state: &AppState, user_id: Uuid) -> AppResult<UserProfile> {
    let user = db::find_user_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let Some(sealed) = user.enc_profile else {
        return Ok(UserProfile::default());
    };
    Ok(state.cipher.open_profile(&sealed).unwrap_or_else(|e| {
        tracing::warn!("Profile of user {} could not be opened: {}", user_id, e);
        UserProfile::default()
    }))
}

async fn get_profile(
    State(state): State<SharedState>,
    caller: Caller,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(load_profile(&state, caller.user_id).await?))
}

async fn put_profile(
    State(state): State<SharedState>,
    caller: Caller,
    Json(profile): Json<UserProfile>,
) -> AppResult<Json<UserProfile>> {
    if profile.years_experience.is_some_and(|y| y > 70) {
        return Err(AppError::BadRequest("years of experience looks wrong".into()));
    }
    let sealed = state
        .cipher
        .seal_profile(&profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("sealing profile failed: {e}")))?;
    db::save_profile(&state.pool, caller.user_id, &sealed).await?;
    tracing::debug!("Profile updated for user {}", caller.user_id);
    Ok(Json(profile))
}
