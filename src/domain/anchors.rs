//! Career-anchor reference data: the 8 categories and the 40 survey statements.
//!
//! Statements are interleaved: category at position `k` in [`ANCHORS`] owns
//! question indices `k, k + 8, k + 16, k + 24, k + 32`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const QUESTION_COUNT: usize = 40;
pub const QUESTIONS_PER_ANCHOR: usize = 5;
pub const MIN_LIKERT: i64 = 1;
pub const MAX_LIKERT: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnchorKey {
    #[serde(rename = "TF")]
    TechnicalFunctional,
    #[serde(rename = "GM")]
    GeneralManagerial,
    #[serde(rename = "AU")]
    Autonomy,
    #[serde(rename = "SE")]
    Security,
    #[serde(rename = "EC")]
    EntrepreneurialCreativity,
    #[serde(rename = "SV")]
    Service,
    #[serde(rename = "CH")]
    PureChallenge,
    #[serde(rename = "LS")]
    Lifestyle,
}

/// Fixed category order. Tie-breaks everywhere follow this order.
pub const ANCHORS: [AnchorKey; 8] = [
    AnchorKey::TechnicalFunctional,
    AnchorKey::GeneralManagerial,
    AnchorKey::Autonomy,
    AnchorKey::Security,
    AnchorKey::EntrepreneurialCreativity,
    AnchorKey::Service,
    AnchorKey::PureChallenge,
    AnchorKey::Lifestyle,
];

impl AnchorKey {
    pub fn code(&self) -> &'static str {
        match self {
            AnchorKey::TechnicalFunctional => "TF",
            AnchorKey::GeneralManagerial => "GM",
            AnchorKey::Autonomy => "AU",
            AnchorKey::Security => "SE",
            AnchorKey::EntrepreneurialCreativity => "EC",
            AnchorKey::Service => "SV",
            AnchorKey::PureChallenge => "CH",
            AnchorKey::Lifestyle => "LS",
        }
    }

    pub fn from_code(raw: &str) -> Option<Self> {
        ANCHORS
            .iter()
            .copied()
            .find(|a| a.code().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn position(&self) -> usize {
        ANCHORS.iter().position(|a| a == self).unwrap_or(0)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AnchorKey::TechnicalFunctional => "Technical/Functional Competence",
            AnchorKey::GeneralManagerial => "General Managerial Competence",
            AnchorKey::Autonomy => "Autonomy/Independence",
            AnchorKey::Security => "Security/Stability",
            AnchorKey::EntrepreneurialCreativity => "Entrepreneurial Creativity",
            AnchorKey::Service => "Service/Dedication to a Cause",
            AnchorKey::PureChallenge => "Pure Challenge",
            AnchorKey::Lifestyle => "Lifestyle",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnchorKey::TechnicalFunctional => {
                "Motivated by mastering a specialised field and being recognised as an expert."
            }
            AnchorKey::GeneralManagerial => {
                "Motivated by leading people, integrating functions and owning overall results."
            }
            AnchorKey::Autonomy => {
                "Motivated by freedom to set one's own pace, methods and standards of work."
            }
            AnchorKey::Security => {
                "Motivated by stable employment, predictable income and long-term tenure."
            }
            AnchorKey::EntrepreneurialCreativity => {
                "Motivated by creating new ventures, products or services of one's own."
            }
            AnchorKey::Service => {
                "Motivated by work that embodies personal values and improves society."
            }
            AnchorKey::PureChallenge => {
                "Motivated by solving hard problems and winning against tough odds."
            }
            AnchorKey::Lifestyle => {
                "Motivated by integrating career, family and personal life into a balanced whole."
            }
        }
    }

    /// The five question indices belonging to this category.
    pub fn question_indices(&self) -> [usize; QUESTIONS_PER_ANCHOR] {
        let k = self.position();
        [k, k + 8, k + 16, k + 24, k + 32]
    }
}

impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Statements in question-index order.
pub const QUESTIONS: [&str; QUESTION_COUNT] = [
    // 0..8
    "I want to become so skilled in my field that others keep coming to me for expert advice.",
    "I am most fulfilled when I can coordinate the efforts of others toward a common goal.",
    "I want a career that lets me decide how and when to do my work.",
    "Security and stability matter more to me than freedom or independence.",
    "I am always on the lookout for ideas that would let me start my own business.",
    "I feel successful only when I contribute something real to the welfare of society.",
    "I seek out problems that seem almost impossible to solve.",
    "I want a career that lets me balance my personal, family and work needs.",
    // 8..16
    "I feel most fulfilled when I can apply my specialised skills at a very high level.",
    "I aspire to a position where I am responsible for the overall results of an organisation.",
    "I would turn down a promotion if it reduced my freedom to organise my own work.",
    "I look for organisations that offer long-term employment and predictable conditions.",
    "Building something that is entirely my own creation matters a great deal to me.",
    "I want my work to serve a cause I genuinely believe in.",
    "I feel most alive when I overcome hard obstacles and tough competitors.",
    "I would rather leave an organisation than take a job that damages my personal life.",
    // 16..24
    "I would rather deepen my expertise than be promoted out of my area of competence.",
    "I would consider my career successful only if I reach a senior leadership role.",
    "I feel most satisfied when I can define my own tasks, schedule and procedures.",
    "I feel most at ease when my income and future at work are secure.",
    "I would be most fulfilled by creating a product or service that carries my own mark.",
    "Using my skills to make the world a better place matters more to me than income.",
    "Easy work bores me quickly; I need constant challenge.",
    "Success for me means a life where work and personal time fit together well.",
    // 24..32
    "Being recognised as an expert matters more to me than a senior general title.",
    "I enjoy taking decisions that affect many people and many parts of an organisation.",
    "Rules and close supervision at work quickly frustrate me.",
    "I would rather stay in one place than take on a risky opportunity.",
    "I am willing to take financial risks to build a venture of my own.",
    "I would leave a job that asked me to act against the values I care about.",
    "I measure my success by the difficulty of the problems I have solved.",
    "I would turn down a move or promotion that disrupted my family life.",
    // 32..40
    "I would leave an organisation that moved me away from my professional speciality.",
    "I would rather run a whole unit than be a top specialist in one function.",
    "Being free to work on my own terms matters more to me than job security.",
    "A stable job with solid benefits is one of my most important career goals.",
    "I have long wanted to found and grow my own organisation.",
    "I choose work by how much it helps other people.",
    "I would choose a difficult, uncertain assignment over a comfortable routine one.",
    "Balancing work with the rest of my life matters more to me than career advancement.",
];

pub const SCALE_LABELS: [&str; 6] = [
    "Never true for me",
    "Rarely true for me",
    "Occasionally true for me",
    "Often true for me",
    "Frequently true for me",
    "Always true for me",
];

/// Question index -> owning category.
pub static QUESTION_ANCHOR: Lazy<[AnchorKey; QUESTION_COUNT]> = Lazy::new(|| {
    let mut table = [AnchorKey::TechnicalFunctional; QUESTION_COUNT];
    for anchor in ANCHORS {
        for idx in anchor.question_indices() {
            table[idx] = anchor;
        }
    }
    table
});

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub text: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnchorView {
    pub key: AnchorKey,
    pub display_name: &'static str,
    pub description: &'static str,
    pub question_indices: [usize; QUESTIONS_PER_ANCHOR],
}

pub fn question_views() -> Vec<QuestionView> {
    QUESTIONS
        .iter()
        .enumerate()
        .map(|(index, text)| QuestionView { index, text })
        .collect()
}

pub fn anchor_views() -> Vec<AnchorView> {
    ANCHORS
        .iter()
        .map(|a| AnchorView {
            key: *a,
            display_name: a.display_name(),
            description: a.description(),
            question_indices: a.question_indices(),
        })
        .collect()
}
