use crate::analytics::team_balance::{build_team_balance, TeamBalanceReport};
use crate::db;
use crate::domain::models::{Caller, Team, UserRole};
use crate::error::{AppError, AppResult};
use crate::state::{AppState, SharedState};
use crate::web::projects::{project_or_404, supervises};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct TeamMember {
    pub user_id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMember>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/join", post(join_team))
        .route("/:id", get(team_detail))
        .route("/:id/balance", get(team_balance))
        .with_state(state)
}

/// Team visible to its members and to supervisors of its project.
async fn visible_team(state: &AppState, caller: &Caller, team_id: Uuid) -> AppResult<Team> {
    let team = db::find_team(&state.pool, team_id)
        .await?
        .ok_or(AppError::NotFound("team"))?;
    if db::is_team_member(&state.pool, team.id, caller.user_id).await? {
        return Ok(team);
    }
    let project = project_or_404(state, team.project_id).await?;
    if supervises(caller, &project) {
        return Ok(team);
    }
    Err(AppError::PermissionDenied)
}

async fn join_team(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<JoinRequest>,
) -> AppResult<Json<Team>> {
    let team = db::find_team_by_code(&state.pool, &payload.code)
        .await?
        .ok_or(AppError::NotFound("team"))?;
    db::add_team_member(&state.pool, team.id, caller.user_id).await?;
    tracing::info!("User {} joined team {}", caller.user_id, team.id);
    Ok(Json(team))
}

async fn team_detail(
    State(state): State<SharedState>,
    caller: Caller,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<TeamDetail>> {
    let team = visible_team(&state, &caller, team_id).await?;
    let members = db::list_team_members(&state.pool, team.id)
        .await?
        .into_iter()
        .map(|row| TeamMember {
            user_id: row.user_id,
            name: state.cipher.display_name(&row.enc_name),
            role: row.role,
            joined_at: row.joined_at,
        })
        .collect();
    Ok(Json(TeamDetail { team, members }))
}

async fn team_balance(
    State(state): State<SharedState>,
    caller: Caller,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<TeamBalanceReport>> {
    let team = visible_team(&state, &caller, team_id).await?;
    let report = build_team_balance(&state.store, team.id).await?;
    Ok(Json(report))
}
