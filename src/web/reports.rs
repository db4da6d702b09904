use crate::domain::models::Caller;
use crate::domain::report::ReportStyle;
use crate::error::AppResult;
use crate::services::report::{self, ReportEnvelope};
use crate::state::SharedState;
use crate::web::profile::load_profile;
use crate::web::survey::owner_for;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ReportRequest {
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub style: ReportStyle,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/career", post(career_report))
        .with_state(state)
}

async fn career_report(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<ReportRequest>,
) -> AppResult<Json<ReportEnvelope>> {
    let owner = owner_for(&state, &caller, payload.project_id).await?;
    let profile = load_profile(&state, caller.user_id).await?;
    let envelope = report::assemble(
        &state.store,
        state.generator(),
        &owner,
        Some(&profile),
        payload.style,
    )
    .await?;
    Ok(Json(envelope))
}
