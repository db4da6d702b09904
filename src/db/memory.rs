//! In-memory stores for service tests.

use super::{BoardStore, ResultStore};
use crate::domain::models::{
    BoardRole, BoardTemplate, MemberScores, NewNote, NotePatch, ResultOwner, StickyNote,
    SurveyResult,
};
use crate::domain::report::ReportPayload;
use crate::domain::scoring::{CategoryScores, ScoreOutcome, SurveyAnswers};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    results: HashMap<ResultOwner, SurveyResult>,
    report_writes: usize,
    project_owners: HashMap<Uuid, Uuid>,
    templates: HashMap<Uuid, BoardTemplate>,
    // team -> (project, members in join order)
    teams: HashMap<Uuid, (Uuid, Vec<Uuid>)>,
    notes: Vec<StickyNote>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, owner_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().project_owners.insert(id, owner_id);
        id
    }

    pub fn add_template(&self, project_id: Uuid) -> BoardTemplate {
        let template = BoardTemplate {
            id: Uuid::new_v4(),
            project_id,
            title: "Business Model Canvas".into(),
            description: None,
            created_at: Utc::now(),
        };
        self.inner
            .lock()
            .unwrap()
            .templates
            .insert(template.id, template.clone());
        template
    }

    pub fn add_team(&self, project_id: Uuid, members: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .lock()
            .unwrap()
            .teams
            .insert(id, (project_id, members.to_vec()));
        id
    }

    pub fn put_scores(&self, owner: ResultOwner, scores: CategoryScores) {
        let now = Utc::now();
        let top_anchor = scores.top_anchor();
        self.inner.lock().unwrap().results.insert(
            owner,
            SurveyResult {
                id: Uuid::new_v4(),
                user_id: owner.user_id,
                project_id: owner.project_id,
                scores,
                top_anchor,
                report: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn report_writes(&self) -> usize {
        self.inner.lock().unwrap().report_writes
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn get_result(&self, owner: &ResultOwner) -> Result<Option<SurveyResult>> {
        Ok(self.inner.lock().unwrap().results.get(owner).cloned())
    }

    async fn upsert_result(
        &self,
        owner: &ResultOwner,
        _answers: &SurveyAnswers,
        outcome: &ScoreOutcome,
    ) -> Result<SurveyResult> {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.results.entry(*owner).or_insert_with(|| SurveyResult {
            id: Uuid::new_v4(),
            user_id: owner.user_id,
            project_id: owner.project_id,
            scores: outcome.scores.clone(),
            top_anchor: outcome.top_anchor,
            report: None,
            created_at: now,
            updated_at: now,
        });
        entry.scores = outcome.scores.clone();
        entry.top_anchor = outcome.top_anchor;
        entry.report = None;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn save_report(&self, result_id: Uuid, report: &ReportPayload) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.report_writes += 1;
        if let Some(result) = inner.results.values_mut().find(|r| r.id == result_id) {
            result.report = Some(report.clone());
        }
        Ok(())
    }

    async fn list_member_results(&self, team_id: Uuid) -> Result<Vec<MemberScores>> {
        let inner = self.inner.lock().unwrap();
        let Some((project_id, members)) = inner.teams.get(&team_id) else {
            return Ok(Vec::new());
        };
        Ok(members
            .iter()
            .filter_map(|user_id| {
                let scoped = ResultOwner {
                    user_id: *user_id,
                    project_id: Some(*project_id),
                };
                inner
                    .results
                    .get(&scoped)
                    .or_else(|| inner.results.get(&ResultOwner::personal(*user_id)))
                    .map(|r| MemberScores {
                        user_id: *user_id,
                        scores: r.scores.clone(),
                    })
            })
            .collect())
    }
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn find_template(&self, template_id: Uuid) -> Result<Option<BoardTemplate>> {
        Ok(self.inner.lock().unwrap().templates.get(&template_id).cloned())
    }

    async fn team_project(&self, team_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .teams
            .get(&team_id)
            .map(|(project_id, _)| *project_id))
    }

    async fn board_role(
        &self,
        template: &BoardTemplate,
        team_id: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<BoardRole> {
        let inner = self.inner.lock().unwrap();
        if inner.project_owners.get(&template.project_id) == Some(&user_id) {
            return Ok(BoardRole::Supervisor);
        }
        let member = inner.teams.iter().any(|(id, (project_id, members))| {
            *project_id == template.project_id
                && team_id.map_or(true, |t| t == *id)
                && members.contains(&user_id)
        });
        Ok(if member {
            BoardRole::Participant
        } else {
            BoardRole::Outsider
        })
    }

    async fn find_note(&self, id: Uuid) -> Result<Option<StickyNote>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .notes
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn insert_note(&self, note: &NewNote) -> Result<StickyNote> {
        let now = Utc::now();
        let created = StickyNote {
            id: Uuid::new_v4(),
            template_id: note.template_id,
            team_id: note.team_id,
            author_id: note.author_id,
            content: note.content.clone(),
            color: note.color,
            x: note.x,
            y: note.y,
            width: note.width,
            height: note.height,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().notes.push(created.clone());
        Ok(created)
    }

    async fn update_note(&self, id: Uuid, patch: &NotePatch) -> Result<Option<StickyNote>> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.notes.iter_mut().find(|n| n.id == id).map(|note| {
            note.apply(patch);
            note.clone()
        }))
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.notes.len();
        inner.notes.retain(|n| n.id != id);
        Ok(inner.notes.len() < before)
    }

    async fn list_notes(&self, template_id: Uuid, team_id: Option<Uuid>) -> Result<Vec<StickyNote>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .notes
            .iter()
            .filter(|n| n.template_id == template_id && n.team_id == team_id)
            .cloned()
            .collect())
    }
}
