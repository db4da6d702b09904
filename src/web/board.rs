use crate::domain::board::NoteDraft;
use crate::domain::models::{Caller, NotePatch, StickyNote};
use crate::error::AppResult;
use crate::services::board;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct BoardQuery {
    pub team_id: Option<Uuid>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/board/:template_id/notes", get(list_notes).post(create_note))
        .route("/notes/:id", patch(update_note).delete(delete_note))
        .with_state(state)
}

async fn list_notes(
    State(state): State<SharedState>,
    caller: Caller,
    Path(template_id): Path<Uuid>,
    Query(query): Query<BoardQuery>,
) -> AppResult<Json<Vec<StickyNote>>> {
    let notes = board::list_notes(&state.store, &caller, template_id, query.team_id).await?;
    Ok(Json(notes))
}

async fn create_note(
    State(state): State<SharedState>,
    caller: Caller,
    Path(template_id): Path<Uuid>,
    Json(draft): Json<NoteDraft>,
) -> AppResult<(StatusCode, Json<StickyNote>)> {
    let note = board::create_note(&state.store, &caller, template_id, &draft).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn update_note(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(patch): Json<NotePatch>,
) -> AppResult<Json<StickyNote>> {
    Ok(Json(board::update_note(&state.store, &caller, id, &patch).await?))
}

async fn delete_note(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    board::delete_note(&state.store, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
