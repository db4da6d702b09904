//! Sticky-note board rules shared by the API and the board client model.
//!
//! The server validates and clamps note geometry. The client side keeps a
//! local projection of the board, applies its own mutations optimistically
//! and, when any persistence call fails, throws the projection away and
//! re-pulls the authoritative note list.

use crate::domain::models::{NewNote, NoteColor, NotePatch, StickyNote};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_X: f64 = 40.0;
pub const DEFAULT_Y: f64 = 40.0;
pub const DEFAULT_WIDTH: f64 = 200.0;
pub const DEFAULT_HEIGHT: f64 = 160.0;
pub const MIN_SIZE: f64 = 80.0;
pub const MAX_SIZE: f64 = 1200.0;
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteRuleError {
    #[error("note content exceeds {MAX_CONTENT_CHARS} characters")]
    ContentTooLong,
    #[error("update contains no fields")]
    EmptyPatch,
    #[error("note geometry must be finite")]
    NonFiniteGeometry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteDraft {
    pub team_id: Option<Uuid>,
    pub content: Option<String>,
    pub color: Option<NoteColor>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

fn position(value: f64) -> Result<f64, NoteRuleError> {
    if !value.is_finite() {
        return Err(NoteRuleError::NonFiniteGeometry);
    }
    Ok(value.max(0.0))
}

fn size(value: f64) -> Result<f64, NoteRuleError> {
    if !value.is_finite() {
        return Err(NoteRuleError::NonFiniteGeometry);
    }
    Ok(value.clamp(MIN_SIZE, MAX_SIZE))
}

fn content(value: &str) -> Result<String, NoteRuleError> {
    if value.chars().count() > MAX_CONTENT_CHARS {
        return Err(NoteRuleError::ContentTooLong);
    }
    Ok(value.to_string())
}

/// Fills defaults for a new note and clamps whatever the caller supplied.
pub fn new_note(
    template_id: Uuid,
    author_id: Uuid,
    draft: &NoteDraft,
) -> Result<NewNote, NoteRuleError> {
    Ok(NewNote {
        template_id,
        team_id: draft.team_id,
        author_id,
        content: content(draft.content.as_deref().unwrap_or(""))?,
        color: draft.color.unwrap_or_default(),
        x: position(draft.x.unwrap_or(DEFAULT_X))?,
        y: position(draft.y.unwrap_or(DEFAULT_Y))?,
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
    })
}

/// Validates a partial update, returning the clamped patch to persist.
pub fn sanitize_patch(patch: &NotePatch) -> Result<NotePatch, NoteRuleError> {
    if patch.is_empty() {
        return Err(NoteRuleError::EmptyPatch);
    }
    Ok(NotePatch {
        content: patch.content.as_deref().map(content).transpose()?,
        color: patch.color,
        x: patch.x.map(position).transpose()?,
        y: patch.y.map(position).transpose()?,
        width: patch.width.map(size).transpose()?,
        height: patch.height.map(size).transpose()?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Editing {
        draft: String,
    },
    Dragging {
        grab_offset: Point,
        origin: Point,
        current: Point,
    },
}

/// Per-note pointer/keyboard state on the client.
#[derive(Debug, Clone, Default)]
pub struct NoteInteraction {
    state: InteractionState,
}

impl NoteInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn double_click(&mut self, note: &StickyNote, viewer: Uuid) -> bool {
        if note.author_id != viewer || self.state != InteractionState::Idle {
            return false;
        }
        self.state = InteractionState::Editing {
            draft: note.content.clone(),
        };
        true
    }

    pub fn type_text(&mut self, text: &str) {
        if let InteractionState::Editing { draft } = &mut self.state {
            *draft = text.to_string();
        }
    }

    /// Leaves editing; emits a patch only if the text changed.
    pub fn commit(&mut self, note: &StickyNote) -> Option<NotePatch> {
        match std::mem::take(&mut self.state) {
            InteractionState::Editing { draft } if draft != note.content => Some(NotePatch {
                content: Some(draft),
                ..NotePatch::default()
            }),
            InteractionState::Editing { .. } => None,
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn pointer_down(&mut self, note: &StickyNote, viewer: Uuid, pointer: Point) -> bool {
        if note.author_id != viewer || self.state != InteractionState::Idle {
            return false;
        }
        let origin = Point { x: note.x, y: note.y };
        self.state = InteractionState::Dragging {
            grab_offset: Point {
                x: pointer.x - note.x,
                y: pointer.y - note.y,
            },
            origin,
            current: origin,
        };
        true
    }

    pub fn pointer_move(&mut self, pointer: Point) -> Option<Point> {
        if let InteractionState::Dragging {
            grab_offset,
            current,
            ..
        } = &mut self.state
        {
            *current = Point {
                x: (pointer.x - grab_offset.x).max(0.0),
                y: (pointer.y - grab_offset.y).max(0.0),
            };
            return Some(*current);
        }
        None
    }

    /// Ends a drag; emits a position patch only if the note actually moved.
    pub fn pointer_up(&mut self) -> Option<NotePatch> {
        match std::mem::take(&mut self.state) {
            InteractionState::Dragging {
                origin, current, ..
            } if origin != current => Some(NotePatch {
                x: Some(current.x),
                y: Some(current.y),
                ..NotePatch::default()
            }),
            InteractionState::Dragging { .. } => None,
            other => {
                self.state = other;
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardMutation {
    Create(StickyNote),
    Update { id: Uuid, patch: NotePatch },
    Delete(Uuid),
}

/// Client-side view of one board. The server is the source of truth.
#[derive(Debug, Clone, Default)]
pub struct BoardProjection {
    notes: Vec<StickyNote>,
    stale: bool,
}

impl BoardProjection {
    pub fn new(notes: Vec<StickyNote>) -> Self {
        Self {
            notes,
            stale: false,
        }
    }

    pub fn notes(&self) -> &[StickyNote] {
        &self.notes
    }

    pub fn get(&self, id: Uuid) -> Option<&StickyNote> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn apply(&mut self, mutation: &BoardMutation) {
        match mutation {
            BoardMutation::Create(note) => self.notes.push(note.clone()),
            BoardMutation::Update { id, patch } => {
                if let Some(note) = self.notes.iter_mut().find(|n| n.id == *id) {
                    note.apply(patch);
                }
            }
            BoardMutation::Delete(id) => self.notes.retain(|n| n.id != *id),
        }
    }

    /// Swaps an optimistic note for the copy the server returned.
    pub fn confirm_created(&mut self, local_id: Uuid, persisted: StickyNote) {
        match self.notes.iter_mut().find(|n| n.id == local_id) {
            Some(slot) => *slot = persisted,
            None => self.notes.push(persisted),
        }
    }

    /// Records the outcome of the persistence call behind a mutation.
    pub fn settle<T, E>(&mut self, outcome: &Result<T, E>) {
        if outcome.is_err() {
            self.stale = true;
        }
    }

    pub fn needs_resync(&self) -> bool {
        self.stale
    }

    pub fn resync(&mut self, authoritative: Vec<StickyNote>) {
        self.notes = authoritative;
        self.stale = false;
    }
}
