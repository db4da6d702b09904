use crate::db;
use crate::domain::models::{BoardTemplate, Caller, Project, Team};
use crate::error::{AppError, AppResult};
use crate::state::{AppState, SharedState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

const JOIN_CODE_LEN: usize = 6;
// No 0/O or 1/I so codes survive being read aloud.
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_ATTEMPTS: usize = 5;

#[derive(Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct NewTeam {
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewTemplate {
    pub title: String,
    pub description: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(create_project).get(list_projects))
        .route("/:id/teams", post(create_team).get(list_teams))
        .route("/:id/templates", post(create_template).get(list_templates))
        .with_state(state)
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn new_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

pub(crate) async fn project_or_404(state: &AppState, project_id: Uuid) -> AppResult<Project> {
    db::find_project(&state.pool, project_id)
        .await?
        .ok_or(AppError::NotFound("project"))
}

pub(crate) fn supervises(caller: &Caller, project: &Project) -> bool {
    caller.is_admin() || project.owner_id == caller.user_id
}

/// Project the caller owns (or any project for admins).
async fn supervised_project(state: &AppState, caller: &Caller, project_id: Uuid) -> AppResult<Project> {
    let project = project_or_404(state, project_id).await?;
    if !supervises(caller, &project) {
        return Err(AppError::PermissionDenied);
    }
    Ok(project)
}

/// Project the caller supervises or belongs to through a team.
pub(crate) async fn visible_project(state: &AppState, caller: &Caller, project_id: Uuid) -> AppResult<Project> {
    let project = project_or_404(state, project_id).await?;
    if supervises(caller, &project)
        || db::is_project_member(&state.pool, project.id, caller.user_id).await?
    {
        return Ok(project);
    }
    Err(AppError::PermissionDenied)
}

async fn create_project(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<NewProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    if !caller.role.can_create_projects() {
        return Err(AppError::PermissionDenied);
    }
    let name = required(&payload.name, "name")?;
    let project = db::create_project(
        &state.pool,
        caller.user_id,
        &name,
        optional_text(payload.description.as_deref()),
    )
    .await?;
    tracing::info!("Project {} created by {}", project.id, caller.user_id);
    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_projects(
    State(state): State<SharedState>,
    caller: Caller,
) -> AppResult<Json<Vec<Project>>> {
    let projects = db::list_projects_for(&state.pool, caller.user_id, caller.role).await?;
    Ok(Json(projects))
}

async fn create_team(
    State(state): State<SharedState>,
    caller: Caller,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<NewTeam>,
) -> AppResult<(StatusCode, Json<Team>)> {
    let project = supervised_project(&state, &caller, project_id).await?;
    let name = required(&payload.name, "name")?;

    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = new_join_code();
        if db::find_team_by_code(&state.pool, &code).await?.is_some() {
            continue;
        }
        let team = db::create_team(&state.pool, project.id, &name, &code).await?;
        tracing::info!("Team {} created in project {}", team.id, project.id);
        return Ok((StatusCode::CREATED, Json(team)));
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "no free join code after {JOIN_CODE_ATTEMPTS} attempts"
    )))
}

async fn list_teams(
    State(state): State<SharedState>,
    caller: Caller,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Team>>> {
    let project = visible_project(&state, &caller, project_id).await?;
    Ok(Json(db::list_teams(&state.pool, project.id).await?))
}

async fn create_template(
    State(state): State<SharedState>,
    caller: Caller,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<NewTemplate>,
) -> AppResult<(StatusCode, Json<BoardTemplate>)> {
    let project = supervised_project(&state, &caller, project_id).await?;
    let title = required(&payload.title, "title")?;
    let template = db::create_template(
        &state.pool,
        project.id,
        &title,
        optional_text(payload.description.as_deref()),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn list_templates(
    State(state): State<SharedState>,
    caller: Caller,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<BoardTemplate>>> {
    let project = visible_project(&state, &caller, project_id).await?;
    Ok(Json(db::list_templates(&state.pool, project.id).await?))
}
