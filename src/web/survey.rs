use crate::db::ResultStore;
use crate::domain::anchors::{anchor_views, question_views, AnchorView, QuestionView, SCALE_LABELS};
use crate::domain::models::{Caller, ResultOwner, SurveyResult};
use crate::domain::scoring::{self, SurveyAnswers};
use crate::error::{AppError, AppResult};
use crate::state::{AppState, SharedState};
use crate::web::projects::visible_project;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize)]
pub struct SurveyDefinition {
    pub questions: Vec<QuestionView>,
    pub anchors: Vec<AnchorView>,
    pub scale: Vec<&'static str>,
}

#[derive(Deserialize)]
pub struct Submission {
    pub answers: SurveyAnswers,
    pub project_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ResultQuery {
    pub project_id: Option<Uuid>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/questions", get(questions))
        .route("/submit", post(submit))
        .route("/result", get(result))
        .with_state(state)
}

/// Result key for the caller, checking access to the project when one is given.
pub(crate) async fn owner_for(
    state: &AppState,
    caller: &Caller,
    project_id: Option<Uuid>,
) -> AppResult<ResultOwner> {
    if let Some(project_id) = project_id {
        visible_project(state, caller, project_id).await?;
    }
    Ok(ResultOwner {
        user_id: caller.user_id,
        project_id,
    })
}

async fn questions() -> Json<SurveyDefinition> {
    Json(SurveyDefinition {
        questions: question_views(),
        anchors: anchor_views(),
        scale: SCALE_LABELS.to_vec(),
    })
}

async fn submit(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<Submission>,
) -> AppResult<Json<SurveyResult>> {
    let outcome = scoring::score(&payload.answers)?;
    let owner = owner_for(&state, &caller, payload.project_id).await?;
    let result = state
        .store
        .upsert_result(&owner, &payload.answers, &outcome)
        .await?;
    tracing::info!(
        "Survey scored for user {} (top anchor {})",
        caller.user_id,
        result.top_anchor
    );
    Ok(Json(result))
}

async fn result(
    State(state): State<SharedState>,
    caller: Caller,
    Query(query): Query<ResultQuery>,
) -> AppResult<Json<SurveyResult>> {
    let owner = owner_for(&state, &caller, query.project_id).await?;
    state
        .store
        .get_result(&owner)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("survey result"))
}
