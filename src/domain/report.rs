//! AI career report payloads, prompt rendering and response parsing.

use crate::domain::anchors::AnchorKey;
use crate::domain::models::UserProfile;
use crate::domain::scoring::CategoryScores;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportStyle {
    /// Free-text career narrative.
    #[default]
    Narrative,
    /// Multi-section JSON report.
    Detailed,
}

impl ReportStyle {
    pub fn temperature(&self) -> f32 {
        match self {
            ReportStyle::Narrative => 0.7,
            ReportStyle::Detailed => 0.4,
        }
    }

    pub fn max_output_tokens(&self) -> u16 {
        match self {
            ReportStyle::Narrative => 1200,
            ReportStyle::Detailed => 3000,
        }
    }

    pub fn json_mode(&self) -> bool {
        matches!(self, ReportStyle::Detailed)
    }

    fn weakest_count(&self) -> usize {
        match self {
            ReportStyle::Narrative => 2,
            ReportStyle::Detailed => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyReport {
    pub summary: String,
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorInsight {
    pub anchor: String,
    pub title: String,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerSuggestion {
    pub title: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub horizon: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedReport {
    pub executive_summary: String,
    pub anchor_insights: Vec<AnchorInsight>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub career_suggestions: Vec<CareerSuggestion>,
    pub roadmap: Vec<RoadmapStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_note: Option<String>,
}

/// Cached report payload. The `kind` tag is always written on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPayload {
    Narrative { text: String },
    Legacy(LegacyReport),
    Expanded(ExpandedReport),
}

impl ReportPayload {
    /// Reads a stored payload. Rows written before the `kind` tag existed
    /// carry the bare `{summary, advice}` shape, and plain JSON strings are
    /// narrative text.
    pub fn from_stored(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(ReportPayload::Narrative { text }),
            value if value.get("kind").is_some() => serde_json::from_value(value).ok(),
            value => serde_json::from_value::<LegacyReport>(value)
                .ok()
                .map(ReportPayload::Legacy),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("generated report could not be parsed")]
pub struct MalformedReport;

/// Turns raw generator output into a payload for the requested style.
pub fn parse_response(style: ReportStyle, raw: &str) -> Result<ReportPayload, MalformedReport> {
    match style {
        ReportStyle::Narrative => {
            let text = raw.trim();
            if text.is_empty() {
                return Err(MalformedReport);
            }
            Ok(ReportPayload::Narrative {
                text: text.to_string(),
            })
        }
        ReportStyle::Detailed => {
            if let Ok(report) = serde_json::from_str::<ExpandedReport>(raw.trim()) {
                return Ok(ReportPayload::Expanded(report));
            }
            extract_json_object(raw)
                .and_then(|obj| serde_json::from_str::<ExpandedReport>(obj).ok())
                .map(ReportPayload::Expanded)
                .ok_or(MalformedReport)
        }
    }
}

/// First balanced `{...}` substring that parses as a JSON object.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    let mut start = 0;
    while let Some(offset) = raw[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            let candidate = &raw[open..=close];
            if serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(candidate).is_ok() {
                return Some(candidate);
            }
        }
        start = open + 1;
    }
    None
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

const DETAILED_SCHEMA: &str = r#"{
  "executive_summary": "string",
  "anchor_insights": [{"anchor": "two-letter code", "title": "string", "interpretation": "string"}],
  "strengths": ["string"],
  "weaknesses": ["string"],
  "career_suggestions": [{"title": "string", "rationale": "string"}],
  "roadmap": [{"horizon": "e.g. next 3 months", "actions": ["string"]}],
  "closing_note": "string"
}"#;

/// Deterministic prompt for the generator; same inputs always render the same text.
pub fn render_prompt(
    scores: &CategoryScores,
    top_anchor: AnchorKey,
    profile: Option<&UserProfile>,
    style: ReportStyle,
) -> String {
    let ranked = scores.ranked();
    let mut prompt = String::new();

    prompt.push_str(
        "You are a career counsellor for an entrepreneurship education programme. \
         Interpret the participant's Career Anchors inventory (8 anchors, each scored 1-6).\n\n",
    );

    prompt.push_str("Scores (highest first):\n");
    for (anchor, value) in &ranked {
        let _ = writeln!(prompt, "- {} ({}): {:.2}", anchor.display_name(), anchor.code(), value);
    }

    let _ = writeln!(
        prompt,
        "\nDominant anchor: {} ({}).",
        top_anchor.display_name(),
        top_anchor.code()
    );

    prompt.push_str("\nStrongest anchors:\n");
    for (anchor, value) in ranked.iter().take(3) {
        let _ = writeln!(
            prompt,
            "- {} ({:.2}): {}",
            anchor.display_name(),
            value,
            anchor.description()
        );
    }

    prompt.push_str("\nWeakest anchors:\n");
    let weakest = style.weakest_count();
    for (anchor, value) in ranked.iter().rev().take(weakest) {
        let _ = writeln!(
            prompt,
            "- {} ({:.2}): {}",
            anchor.display_name(),
            value,
            anchor.description()
        );
    }

    if let Some(fields) = profile.map(UserProfile::labelled_fields).filter(|f| !f.is_empty()) {
        prompt.push_str("\nParticipant profile:\n");
        for (label, value) in fields {
            let _ = writeln!(prompt, "- {label}: {value}");
        }
    }

    match style {
        ReportStyle::Narrative => prompt.push_str(
            "\nWrite a personal career report of 4-6 paragraphs in plain prose: what the \
             dominant anchor says about the participant, how the strongest and weakest anchors \
             interact, which entrepreneurial roles fit, and three concrete next steps. \
             Do not use Markdown headings.",
        ),
        ReportStyle::Detailed => {
            prompt.push_str(
                "\nRespond with a single JSON object and nothing else, using exactly this shape:\n",
            );
            prompt.push_str(DETAILED_SCHEMA);
            prompt.push_str(
                "\nInclude one anchor_insights entry per anchor, 3-5 strengths, 3-5 weaknesses, \
                 3 career_suggestions and a roadmap of 3 horizons.",
            );
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_expanded() -> serde_json::Value {
        serde_json::json!({
            "executive_summary": "Builder at heart.",
            "anchor_insights": [{"anchor": "EC", "title": "Creator", "interpretation": "Wants to found things."}],
            "strengths": ["initiative"],
            "weaknesses": ["routine work"],
            "career_suggestions": [{"title": "Founder", "rationale": "High EC."}],
            "roadmap": [{"horizon": "3 months", "actions": ["Validate an idea"]}]
        })
    }

    fn sample_scores() -> CategoryScores {
        CategoryScores::from_fn(|a| match a {
            AnchorKey::EntrepreneurialCreativity => 5.6,
            AnchorKey::PureChallenge => 5.0,
            AnchorKey::Autonomy => 4.4,
            AnchorKey::Security => 1.8,
            AnchorKey::Lifestyle => 2.2,
            _ => 3.0,
        })
    }

    #[test]
    fn strict_json_parses() {
        let raw = sample_expanded().to_string();
        let payload = parse_response(ReportStyle::Detailed, &raw).unwrap();
        match payload {
            ReportPayload::Expanded(r) => assert_eq!(r.executive_summary, "Builder at heart."),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fenced_json_is_extracted() {
        let raw = format!(
            "Sure! Here is the report:\n```json\n{}\n```\nHope it helps {{smile}}",
            serde_json::to_string_pretty(&sample_expanded()).unwrap()
        );
        assert!(matches!(
            parse_response(ReportStyle::Detailed, &raw),
            Ok(ReportPayload::Expanded(_))
        ));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_extraction() {
        let raw = r#"note {not json} then {"a": "x } y", "b": {"c": 1}} tail"#;
        assert_eq!(extract_json_object(raw), Some(r#"{"a": "x } y", "b": {"c": 1}}"#));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            parse_response(ReportStyle::Detailed, "I cannot help with that."),
            Err(MalformedReport)
        );
        assert_eq!(
            parse_response(ReportStyle::Detailed, r#"{"summary": "wrong shape"}"#),
            Err(MalformedReport)
        );
        assert_eq!(parse_response(ReportStyle::Narrative, "   "), Err(MalformedReport));
    }

    #[test]
    fn narrative_text_is_kept_verbatim() {
        let payload = parse_response(ReportStyle::Narrative, "  You thrive on building.\n").unwrap();
        assert_eq!(
            payload,
            ReportPayload::Narrative {
                text: "You thrive on building.".into()
            }
        );
    }

    #[test]
    fn stored_payloads_decode_with_and_without_tag() {
        let tagged = serde_json::to_value(ReportPayload::Narrative { text: "hi".into() }).unwrap();
        assert_eq!(tagged["kind"], "narrative");
        assert_eq!(
            ReportPayload::from_stored(tagged),
            Some(ReportPayload::Narrative { text: "hi".into() })
        );

        let legacy = serde_json::json!({"summary": "s", "advice": "a"});
        assert_eq!(
            ReportPayload::from_stored(legacy),
            Some(ReportPayload::Legacy(LegacyReport {
                summary: "s".into(),
                advice: "a".into()
            }))
        );

        let mut expanded = sample_expanded();
        expanded["kind"] = "expanded".into();
        assert!(matches!(
            ReportPayload::from_stored(expanded),
            Some(ReportPayload::Expanded(_))
        ));
        assert_eq!(ReportPayload::from_stored(serde_json::Value::Null), None);
    }

    #[test]
    fn prompt_is_deterministic_and_ordered() {
        let scores = sample_scores();
        let a = render_prompt(&scores, scores.top_anchor(), None, ReportStyle::Narrative);
        let b = render_prompt(&scores, scores.top_anchor(), None, ReportStyle::Narrative);
        assert_eq!(a, b);

        let ec = a.find("Entrepreneurial Creativity (EC): 5.60").unwrap();
        let ch = a.find("Pure Challenge (CH): 5.00").unwrap();
        let se = a.find("Security/Stability (SE): 1.80").unwrap();
        assert!(ec < ch && ch < se);
        assert!(a.contains("Dominant anchor: Entrepreneurial Creativity (EC)."));
        assert!(!a.contains("Participant profile"));
    }

    #[test]
    fn detailed_prompt_lists_three_weakest_and_profile() {
        let scores = sample_scores();
        let profile = UserProfile {
            occupation: Some("Student".into()),
            industry: Some("Fintech".into()),
            ..UserProfile::default()
        };
        let prompt = render_prompt(&scores, scores.top_anchor(), Some(&profile), ReportStyle::Detailed);
        let weakest = prompt.split("Weakest anchors:\n").nth(1).unwrap();
        let weakest_lines = weakest.lines().take_while(|l| l.starts_with("- ")).count();
        assert_eq!(weakest_lines, 3);
        assert!(prompt.contains("- Occupation: Student"));
        assert!(prompt.contains("- Industry: Fintech"));
        assert!(prompt.contains("\"executive_summary\""));
    }
}
