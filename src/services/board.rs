//! Server side of the sticky-note board: permission checks in front of the
//! note store. Concurrent writes to the same note are last-write-wins.

use crate::db::BoardStore;
use crate::domain::board::{self, NoteDraft};
use crate::domain::models::{BoardRole, BoardTemplate, Caller, NotePatch, StickyNote};
use crate::error::{AppError, AppResult};
use uuid::Uuid;

async fn template(store: &dyn BoardStore, template_id: Uuid) -> AppResult<BoardTemplate> {
    store
        .find_template(template_id)
        .await?
        .ok_or_else(|| AppError::NotFound("board template"))
}

/// Caller's role on a board. A team, when given, must belong to the
/// template's project, whoever is asking.
async fn role_on(
    store: &dyn BoardStore,
    caller: &Caller,
    template: &BoardTemplate,
    team_id: Option<Uuid>,
) -> AppResult<BoardRole> {
    if let Some(team_id) = team_id {
        if store.team_project(team_id).await? != Some(template.project_id) {
            return Err(AppError::NotFound("team"));
        }
    }
    if caller.is_admin() {
        return Ok(BoardRole::Supervisor);
    }
    Ok(store.board_role(template, team_id, caller.user_id).await?)
}

/// Loads a note the caller may modify: its author or a supervisor of the
/// project owning the template.
async fn editable_note(store: &dyn BoardStore, caller: &Caller, id: Uuid) -> AppResult<StickyNote> {
    let note = store
        .find_note(id)
        .await?
        .ok_or_else(|| AppError::NotFound("note"))?;
    if note.author_id == caller.user_id {
        return Ok(note);
    }
    let template = template(store, note.template_id).await?;
    match role_on(store, caller, &template, note.team_id).await? {
        BoardRole::Supervisor => Ok(note),
        _ => Err(AppError::PermissionDenied),
    }
}

pub async fn list_notes(
    store: &dyn BoardStore,
    caller: &Caller,
    template_id: Uuid,
    team_id: Option<Uuid>,
) -> AppResult<Vec<StickyNote>> {
    let template = template(store, template_id).await?;
    if role_on(store, caller, &template, team_id).await? == BoardRole::Outsider {
        return Err(AppError::PermissionDenied);
    }
    Ok(store.list_notes(template_id, team_id).await?)
}

pub async fn create_note(
    store: &dyn BoardStore,
    caller: &Caller,
    template_id: Uuid,
    draft: &NoteDraft,
) -> AppResult<StickyNote> {
    let template = template(store, template_id).await?;
    if role_on(store, caller, &template, draft.team_id).await? == BoardRole::Outsider {
        return Err(AppError::PermissionDenied);
    }
    let note = board::new_note(template_id, caller.user_id, draft)?;
    let created = store.insert_note(&note).await?;
    tracing::debug!("Note {} created on template {}", created.id, template_id);
    Ok(created)
}

pub async fn update_note(
    store: &dyn BoardStore,
    caller: &Caller,
    id: Uuid,
    patch: &NotePatch,
) -> AppResult<StickyNote> {
    let patch = board::sanitize_patch(patch)?;
    editable_note(store, caller, id).await?;
    store
        .update_note(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("note"))
}

pub async fn delete_note(store: &dyn BoardStore, caller: &Caller, id: Uuid) -> AppResult<()> {
    editable_note(store, caller, id).await?;
    if !store.delete_note(id).await? {
        return Err(AppError::NotFound("note"));
    }
    tracing::debug!("Note {} deleted by {}", id, caller.user_id);
    Ok(())
}
