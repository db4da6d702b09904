use crate::domain::anchors::AnchorKey;
use crate::domain::report::ReportPayload;
use crate::domain::scoring::CategoryScores;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Teacher => "TEACHER",
            UserRole::Student => "STUDENT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ADMIN" => Some(UserRole::Admin),
            "TEACHER" => Some(UserRole::Teacher),
            "STUDENT" => Some(UserRole::Student),
            _ => None,
        }
    }

    pub fn can_create_projects(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Teacher)
    }
}

/// Optional demographic and work-context fields used to personalise reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age_range: Option<String>,
    pub gender: Option<String>,
    pub education_level: Option<String>,
    pub field_of_study: Option<String>,
    pub occupation: Option<String>,
    pub industry: Option<String>,
    pub years_experience: Option<u16>,
    pub country: Option<String>,
    pub entrepreneurial_experience: Option<String>,
    pub career_goal: Option<String>,
}

impl UserProfile {
    /// Non-empty fields with human-readable labels, in a fixed order.
    pub fn labelled_fields(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("Age range", &self.age_range),
            ("Gender", &self.gender),
            ("Education level", &self.education_level),
            ("Field of study", &self.field_of_study),
            ("Occupation", &self.occupation),
            ("Industry", &self.industry),
        ];
        let mut out: Vec<(&'static str, String)> = text
            .into_iter()
            .filter_map(|(label, value)| non_blank(value).map(|v| (label, v)))
            .collect();
        if let Some(years) = self.years_experience {
            out.push(("Years of work experience", years.to_string()));
        }
        let tail = [
            ("Country", &self.country),
            ("Entrepreneurial experience", &self.entrepreneurial_experience),
            ("Career goal", &self.career_goal),
        ];
        out.extend(
            tail.into_iter()
                .filter_map(|(label, value)| non_blank(value).map(|v| (label, v))),
        );
        out
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Who a survey result belongs to: a user, optionally scoped to one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultOwner {
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
}

impl ResultOwner {
    pub fn personal(user_id: Uuid) -> Self {
        Self {
            user_id,
            project_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub scores: CategoryScores,
    pub top_anchor: AnchorKey,
    pub report: Option<ReportPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberScores {
    pub user_id: Uuid,
    pub scores: CategoryScores,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub join_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BoardTemplate {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "note_color", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    #[default]
    Yellow,
    Pink,
    Blue,
    Green,
    Orange,
    Purple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StickyNote {
    pub id: Uuid,
    pub template_id: Uuid,
    pub team_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub color: NoteColor,
    #[sqlx(rename = "pos_x")]
    pub x: f64,
    #[sqlx(rename = "pos_y")]
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StickyNote {
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
    }
}

/// Fields for a note about to be inserted; defaults come from `domain::board`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub template_id: Uuid,
    pub team_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub color: NoteColor,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    pub content: Option<String>,
    pub color: Option<NoteColor>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl NotePatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.color.is_none()
            && self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
    }
}

/// How a caller relates to a board (template + optional team).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRole {
    Supervisor,
    Participant,
    Outsider,
}

/// Authenticated identity passed explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
