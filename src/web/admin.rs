use crate::db;
use crate::domain::models::{Caller, UserRole};
use crate::error::{AppError, AppResult};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::put,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct RoleChange {
    pub role: UserRole,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/users/:id/role", put(set_role))
        .with_state(state)
}

async fn set_role(
    State(state): State<SharedState>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleChange>,
) -> AppResult<StatusCode> {
    if !caller.is_admin() {
        return Err(AppError::PermissionDenied);
    }
    if user_id == caller.user_id && payload.role != UserRole::Admin {
        return Err(AppError::BadRequest("admins cannot demote themselves".into()));
    }
    if !db::set_user_role(&state.pool, user_id, payload.role).await? {
        return Err(AppError::NotFound("user"));
    }
    tracing::info!(
        "User {} now has role {} (changed by {})",
        user_id,
        payload.role.as_str(),
        caller.user_id
    );
    Ok(StatusCode::NO_CONTENT)
}
