pub mod seed;

#[cfg(test)]
pub mod memory;

use crate::domain::anchors::AnchorKey;
use crate::domain::models::{
    BoardRole, BoardTemplate, MemberScores, NewNote, NotePatch, Project, ResultOwner, StickyNote,
    SurveyResult, Team, UserRole,
};
use crate::domain::report::ReportPayload;
use crate::domain::scoring::{CategoryScores, ScoreOutcome, SurveyAnswers};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

// ========== Collaborator interfaces ==========

/// Survey results as seen by the scoring, aggregation and report flows.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn get_result(&self, owner: &ResultOwner) -> Result<Option<SurveyResult>>;

    /// Creates or overwrites the owner's result and clears any cached report.
    async fn upsert_result(
        &self,
        owner: &ResultOwner,
        answers: &SurveyAnswers,
        outcome: &ScoreOutcome,
    ) -> Result<SurveyResult>;

    async fn save_report(&self, result_id: Uuid, report: &ReportPayload) -> Result<()>;

    /// One score set per team member who has completed the survey.
    async fn list_member_results(&self, team_id: Uuid) -> Result<Vec<MemberScores>>;
}

/// Sticky-note persistence plus the relational facts permission checks need.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn find_template(&self, template_id: Uuid) -> Result<Option<BoardTemplate>>;
    /// Project a team belongs to; `None` for unknown teams.
    async fn team_project(&self, team_id: Uuid) -> Result<Option<Uuid>>;
    async fn board_role(
        &self,
        template: &BoardTemplate,
        team_id: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<BoardRole>;
    async fn find_note(&self, id: Uuid) -> Result<Option<StickyNote>>;
    async fn insert_note(&self, note: &NewNote) -> Result<StickyNote>;
    async fn update_note(&self, id: Uuid, patch: &NotePatch) -> Result<Option<StickyNote>>;
    async fn delete_note(&self, id: Uuid) -> Result<bool>;
    async fn list_notes(&self, template_id: Uuid, team_id: Option<Uuid>) -> Result<Vec<StickyNote>>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ========== Users ==========

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub hash: String,
    pub role: UserRole,
    pub enc_name: String,
    pub enc_profile: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, email, hash, role, enc_name, enc_profile, is_active, created_at";

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active = true"
    ))
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email.trim().to_lowercase())
        .fetch_one(pool)
        .await?;
    Ok(taken)
}

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    hash: &str,
    role: UserRole,
    enc_name: &str,
) -> Result<DbUser> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (id, email, hash, role, enc_name)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(email.trim().to_lowercase())
    .bind(hash)
    .bind(role)
    .bind(enc_name)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn update_password(pool: &PgPool, user_id: Uuid, hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET hash = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_user_role(pool: &PgPool, user_id: Uuid, role: UserRole) -> Result<bool> {
    let done = sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn save_profile(pool: &PgPool, user_id: Uuid, enc_profile: &str) -> Result<()> {
    sqlx::query("UPDATE users SET enc_profile = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(enc_profile)
        .execute(pool)
        .await?;
    Ok(())
}

// ========== Password reset ==========

pub async fn insert_reset_token(
    pool: &PgPool,
    token_hash: &str,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (token_hash, user_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(token_hash)
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Marks a live token used and returns its user; `None` for unknown, used or expired tokens.
pub async fn consume_reset_token(pool: &PgPool, token_hash: &str) -> Result<Option<Uuid>> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE password_reset_tokens
        SET used = TRUE
        WHERE token_hash = $1 AND used = FALSE AND expires_at > now()
        RETURNING user_id
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(user_id)
}

// ========== Projects, teams, templates ==========

pub async fn create_project(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<Project> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (id, owner_id, name, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, owner_id, name, description, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(project)
}

pub async fn find_project(pool: &PgPool, id: Uuid) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(
        "SELECT id, owner_id, name, description, created_at FROM projects WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(project)
}

/// Projects the user owns or belongs to through a team; admins see everything.
pub async fn list_projects_for(pool: &PgPool, user_id: Uuid, role: UserRole) -> Result<Vec<Project>> {
    let projects = sqlx::query_as::<_, Project>(
        r#"
        SELECT DISTINCT p.id, p.owner_id, p.name, p.description, p.created_at
        FROM projects p
        LEFT JOIN teams t ON t.project_id = p.id
        LEFT JOIN team_members tm ON tm.team_id = t.id
        WHERE $2 OR p.owner_id = $1 OR tm.user_id = $1
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(role == UserRole::Admin)
    .fetch_all(pool)
    .await?;
    Ok(projects)
}

pub async fn is_project_member(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool> {
    let member: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM team_members tm
            JOIN teams t ON t.id = tm.team_id
            WHERE t.project_id = $1 AND tm.user_id = $2
        )
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(member)
}

pub async fn create_team(pool: &PgPool, project_id: Uuid, name: &str, join_code: &str) -> Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        INSERT INTO teams (id, project_id, name, join_code)
        VALUES ($1, $2, $3, $4)
        RETURNING id, project_id, name, join_code, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(name)
    .bind(join_code)
    .fetch_one(pool)
    .await?;
    Ok(team)
}

pub async fn find_team(pool: &PgPool, id: Uuid) -> Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>(
        "SELECT id, project_id, name, join_code, created_at FROM teams WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(team)
}

pub async fn find_team_by_code(pool: &PgPool, code: &str) -> Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>(
        "SELECT id, project_id, name, join_code, created_at FROM teams WHERE join_code = $1",
    )
    .bind(code.trim().to_uppercase())
    .fetch_optional(pool)
    .await?;
    Ok(team)
}

pub async fn list_teams(pool: &PgPool, project_id: Uuid) -> Result<Vec<Team>> {
    let teams = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, project_id, name, join_code, created_at
        FROM teams
        WHERE project_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(teams)
}

pub async fn add_team_member(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO team_members (team_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (team_id, user_id) DO NOTHING
        "#,
    )
    .bind(team_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_team_member(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> Result<bool> {
    let member: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2)",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(member)
}

#[derive(Debug, FromRow)]
pub struct TeamMemberRow {
    pub user_id: Uuid,
    pub enc_name: String,
    pub role: UserRole,
    pub joined_at: DateTime<Utc>,
}

pub async fn list_team_members(pool: &PgPool, team_id: Uuid) -> Result<Vec<TeamMemberRow>> {
    let rows = sqlx::query_as::<_, TeamMemberRow>(
        r#"
        SELECT u.id AS user_id, u.enc_name, u.role, tm.joined_at
        FROM team_members tm
        JOIN users u ON u.id = tm.user_id
        WHERE tm.team_id = $1
        ORDER BY tm.joined_at ASC
        "#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create_template(
    pool: &PgPool,
    project_id: Uuid,
    title: &str,
    description: Option<&str>,
) -> Result<BoardTemplate> {
    let template = sqlx::query_as::<_, BoardTemplate>(
        r#"
        INSERT INTO board_templates (id, project_id, title, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, project_id, title, description, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(template)
}

pub async fn list_templates(pool: &PgPool, project_id: Uuid) -> Result<Vec<BoardTemplate>> {
    let templates = sqlx::query_as::<_, BoardTemplate>(
        r#"
        SELECT id, project_id, title, description, created_at
        FROM board_templates
        WHERE project_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(templates)
}

// ========== Survey results ==========

#[derive(Debug, FromRow)]
struct ResultRow {
    id: Uuid,
    user_id: Uuid,
    project_id: Option<Uuid>,
    scores: Json<CategoryScores>,
    top_anchor: String,
    ai_report: Option<Json<serde_json::Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for SurveyResult {
    type Error = anyhow::Error;

    fn try_from(row: ResultRow) -> Result<Self> {
        let top_anchor = AnchorKey::from_code(&row.top_anchor)
            .ok_or_else(|| anyhow!("result {} has unknown top anchor {}", row.id, row.top_anchor))?;
        Ok(SurveyResult {
            id: row.id,
            user_id: row.user_id,
            project_id: row.project_id,
            scores: row.scores.0,
            top_anchor,
            report: row.ai_report.and_then(|json| ReportPayload::from_stored(json.0)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Personal and project-scoped results live under separate partial unique
/// indexes, so the upsert has to name the one the owner falls under.
fn result_conflict_target(owner: &ResultOwner) -> &'static str {
    match owner.project_id {
        Some(_) => "(user_id, project_id) WHERE project_id IS NOT NULL",
        None => "(user_id) WHERE project_id IS NULL",
    }
}

const RESULT_COLUMNS: &str =
    "id, user_id, project_id, scores, top_anchor, ai_report, created_at, updated_at";

#[async_trait]
impl ResultStore for PgStore {
    async fn get_result(&self, owner: &ResultOwner) -> Result<Option<SurveyResult>> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            r#"
            SELECT {RESULT_COLUMNS}
            FROM anchor_results
            WHERE user_id = $1 AND project_id IS NOT DISTINCT FROM $2
            "#
        ))
        .bind(owner.user_id)
        .bind(owner.project_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SurveyResult::try_from).transpose()
    }

    async fn upsert_result(
        &self,
        owner: &ResultOwner,
        answers: &SurveyAnswers,
        outcome: &ScoreOutcome,
    ) -> Result<SurveyResult> {
        let conflict_target = result_conflict_target(owner);
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            r#"
            INSERT INTO anchor_results (id, user_id, project_id, answers, scores, top_anchor)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT {conflict_target}
            DO UPDATE SET answers = EXCLUDED.answers,
                          scores = EXCLUDED.scores,
                          top_anchor = EXCLUDED.top_anchor,
                          ai_report = NULL,
                          updated_at = now()
            RETURNING {RESULT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner.user_id)
        .bind(owner.project_id)
        .bind(Json(answers))
        .bind(Json(&outcome.scores))
        .bind(outcome.top_anchor.code())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn save_report(&self, result_id: Uuid, report: &ReportPayload) -> Result<()> {
        sqlx::query("UPDATE anchor_results SET ai_report = $2 WHERE id = $1")
            .bind(result_id)
            .bind(Json(report))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_member_results(&self, team_id: Uuid) -> Result<Vec<MemberScores>> {
        #[derive(FromRow)]
        struct Row {
            user_id: Uuid,
            scores: Json<CategoryScores>,
        }

        // Prefer the project-scoped result, fall back to the personal one.
        let rows = sqlx::query_as::<_, Row>(
            r#"
            SELECT DISTINCT ON (tm.user_id) tm.user_id, r.scores
            FROM team_members tm
            JOIN teams t ON t.id = tm.team_id
            JOIN anchor_results r
              ON r.user_id = tm.user_id
             AND (r.project_id = t.project_id OR r.project_id IS NULL)
            WHERE tm.team_id = $1
            ORDER BY tm.user_id, r.project_id NULLS LAST
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MemberScores {
                user_id: r.user_id,
                scores: r.scores.0,
            })
            .collect())
    }
}

// ========== Sticky notes ==========

const NOTE_COLUMNS: &str =
    "id, template_id, team_id, author_id, content, color, pos_x, pos_y, width, height, created_at, updated_at";

#[async_trait]
impl BoardStore for PgStore {
    async fn find_template(&self, template_id: Uuid) -> Result<Option<BoardTemplate>> {
        let template = sqlx::query_as::<_, BoardTemplate>(
            "SELECT id, project_id, title, description, created_at FROM board_templates WHERE id = $1",
        )
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }

    async fn team_project(&self, team_id: Uuid) -> Result<Option<Uuid>> {
        let project_id = sqlx::query_scalar::<_, Uuid>("SELECT project_id FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project_id)
    }

    async fn board_role(
        &self,
        template: &BoardTemplate,
        team_id: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<BoardRole> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT owner_id FROM projects WHERE id = $1")
            .bind(template.project_id)
            .fetch_optional(&self.pool)
            .await?;
        if owner == Some(user_id) {
            return Ok(BoardRole::Supervisor);
        }

        let member: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM team_members tm
                JOIN teams t ON t.id = tm.team_id
                WHERE tm.user_id = $1
                  AND t.project_id = $2
                  AND ($3::uuid IS NULL OR t.id = $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(template.project_id)
        .bind(team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(if member {
            BoardRole::Participant
        } else {
            BoardRole::Outsider
        })
    }

    async fn find_note(&self, id: Uuid) -> Result<Option<StickyNote>> {
        let note = sqlx::query_as::<_, StickyNote>(&format!(
            "SELECT {NOTE_COLUMNS} FROM sticky_notes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn insert_note(&self, note: &NewNote) -> Result<StickyNote> {
        let created = sqlx::query_as::<_, StickyNote>(&format!(
            r#"
            INSERT INTO sticky_notes
                (id, template_id, team_id, author_id, content, color, pos_x, pos_y, width, height)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(note.template_id)
        .bind(note.team_id)
        .bind(note.author_id)
        .bind(&note.content)
        .bind(note.color)
        .bind(note.x)
        .bind(note.y)
        .bind(note.width)
        .bind(note.height)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_note(&self, id: Uuid, patch: &NotePatch) -> Result<Option<StickyNote>> {
        let updated = sqlx::query_as::<_, StickyNote>(&format!(
            r#"
            UPDATE sticky_notes
            SET content = COALESCE($2, content),
                color = COALESCE($3, color),
                pos_x = COALESCE($4, pos_x),
                pos_y = COALESCE($5, pos_y),
                width = COALESCE($6, width),
                height = COALESCE($7, height),
                updated_at = now()
            WHERE id = $1
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.content.as_deref())
        .bind(patch.color)
        .bind(patch.x)
        .bind(patch.y)
        .bind(patch.width)
        .bind(patch.height)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM sticky_notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_notes(&self, template_id: Uuid, team_id: Option<Uuid>) -> Result<Vec<StickyNote>> {
        let notes = sqlx::query_as::<_, StickyNote>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM sticky_notes
            WHERE template_id = $1 AND team_id IS NOT DISTINCT FROM $2
            ORDER BY created_at ASC
            "#
        ))
        .bind(template_id)
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }
}
