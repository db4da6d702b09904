//! Career report assembly: cache lookup, prompt, generation, parsing, caching.
//!
//! Cache check and cache write are separate store calls, so two concurrent
//! requests for the same result can both generate; the later write wins.

use crate::db::ResultStore;
use crate::domain::models::{ResultOwner, UserProfile};
use crate::domain::report::{self, ReportPayload, ReportStyle};
use crate::error::{AppError, AppResult};
use crate::services::ai::{GenerationError, GenerationRequest, TextGenerator};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEnvelope {
    pub cached: bool,
    pub report: ReportPayload,
}

pub async fn assemble(
    store: &dyn ResultStore,
    generator: Option<&dyn TextGenerator>,
    owner: &ResultOwner,
    profile: Option<&UserProfile>,
    style: ReportStyle,
) -> AppResult<ReportEnvelope> {
    let result = store
        .get_result(owner)
        .await?
        .ok_or(AppError::MissingResult)?;

    if let Some(report) = result.report {
        tracing::debug!("Serving cached report for result {}", result.id);
        return Ok(ReportEnvelope {
            cached: true,
            report,
        });
    }

    let generator = generator.ok_or(AppError::NotConfigured)?;

    let request = GenerationRequest {
        prompt: report::render_prompt(&result.scores, result.top_anchor, profile, style),
        temperature: style.temperature(),
        max_output_tokens: style.max_output_tokens(),
        json_mode: style.json_mode(),
    };

    let raw = generator.generate(&request).await.map_err(|err| match err {
        GenerationError::Upstream(detail) => AppError::UpstreamError(detail),
    })?;

    let payload = report::parse_response(style, &raw).map_err(|_| {
        tracing::warn!(
            "Discarding unparseable {:?} report for result {} ({} bytes)",
            style,
            result.id,
            raw.len()
        );
        AppError::MalformedResponse
    })?;

    store.save_report(result.id, &payload).await?;
    tracing::info!("Generated {:?} report for result {}", style, result.id);

    Ok(ReportEnvelope {
        cached: false,
        report: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::domain::scoring::{score, uniform_answers};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String, String>>>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err("no scripted reply".into()))
                .map_err(GenerationError::Upstream)
        }
    }

    fn scripted(generator: &ScriptedGenerator) -> Option<&dyn TextGenerator> {
        Some(generator)
    }

    async fn store_with_result(owner: &ResultOwner) -> MemoryStore {
        let store = MemoryStore::new();
        let outcome = score(&uniform_answers(3)).unwrap();
        store
            .upsert_result(owner, &uniform_answers(3), &outcome)
            .await
            .unwrap();
        store
    }

    const DETAILED: &str = r#"Here you go:
```json
{"executive_summary": "Steady.", "anchor_insights": [], "strengths": ["focus"],
 "weaknesses": [], "career_suggestions": [], "roadmap": []}
```"#;

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let owner = ResultOwner::personal(Uuid::new_v4());
        let store = store_with_result(&owner).await;
        let generator = ScriptedGenerator::new(vec![Ok("A thoughtful narrative.")]);

        let first = assemble(&store, scripted(&generator), &owner, None, ReportStyle::Narrative)
            .await
            .unwrap();
        let second = assemble(&store, scripted(&generator), &owner, None, ReportStyle::Narrative)
            .await
            .unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.report, second.report);
        assert_eq!(generator.calls(), 1);
        assert_eq!(store.report_writes(), 1);
    }

    #[tokio::test]
    async fn cached_report_is_returned_without_generator() {
        let owner = ResultOwner::personal(Uuid::new_v4());
        let store = store_with_result(&owner).await;
        let generator = ScriptedGenerator::new(vec![Ok("Narrative.")]);
        assemble(&store, scripted(&generator), &owner, None, ReportStyle::Narrative)
            .await
            .unwrap();

        let again = assemble(&store, None, &owner, None, ReportStyle::Detailed)
            .await
            .unwrap();
        assert!(again.cached);
    }

    #[tokio::test]
    async fn missing_result_and_missing_generator() {
        let owner = ResultOwner::personal(Uuid::new_v4());
        let empty = MemoryStore::new();
        let generator = ScriptedGenerator::new(vec![]);
        assert!(matches!(
            assemble(&empty, scripted(&generator), &owner, None, ReportStyle::Narrative).await,
            Err(AppError::MissingResult)
        ));
        assert_eq!(generator.calls(), 0);

        let store = store_with_result(&owner).await;
        assert!(matches!(
            assemble(&store, None, &owner, None, ReportStyle::Narrative).await,
            Err(AppError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn failures_are_not_cached_and_retry_regenerates() {
        let owner = ResultOwner::personal(Uuid::new_v4());
        let store = store_with_result(&owner).await;
        let generator = ScriptedGenerator::new(vec![
            Err("503 overloaded"),
            Ok("no json here"),
            Ok(DETAILED),
        ]);

        assert!(matches!(
            assemble(&store, scripted(&generator), &owner, None, ReportStyle::Detailed).await,
            Err(AppError::UpstreamError(_))
        ));
        assert!(matches!(
            assemble(&store, scripted(&generator), &owner, None, ReportStyle::Detailed).await,
            Err(AppError::MalformedResponse)
        ));
        assert_eq!(store.report_writes(), 0);
        assert!(store.get_result(&owner).await.unwrap().unwrap().report.is_none());

        let ok = assemble(&store, scripted(&generator), &owner, None, ReportStyle::Detailed)
            .await
            .unwrap();
        assert!(!ok.cached);
        assert!(matches!(ok.report, ReportPayload::Expanded(_)));
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn detailed_style_requests_json_mode() {
        let owner = ResultOwner::personal(Uuid::new_v4());
        let store = store_with_result(&owner).await;
        let generator = ScriptedGenerator::new(vec![Ok(DETAILED)]);
        let profile = UserProfile {
            career_goal: Some("Launch a startup".into()),
            ..UserProfile::default()
        };
        assemble(&store, scripted(&generator), &owner, Some(&profile), ReportStyle::Detailed)
            .await
            .unwrap();

        let seen = generator.seen.lock().unwrap();
        assert!(seen[0].json_mode);
        assert_eq!(seen[0].max_output_tokens, 3000);
        assert!(seen[0].prompt.contains("Career goal: Launch a startup"));
    }

    #[tokio::test]
    async fn resubmission_clears_cached_report() {
        let owner = ResultOwner::personal(Uuid::new_v4());
        let store = store_with_result(&owner).await;
        let generator = ScriptedGenerator::new(vec![Ok("first"), Ok("second")]);
        assemble(&store, scripted(&generator), &owner, None, ReportStyle::Narrative)
            .await
            .unwrap();

        let outcome = score(&uniform_answers(5)).unwrap();
        store
            .upsert_result(&owner, &uniform_answers(5), &outcome)
            .await
            .unwrap();

        let fresh = assemble(&store, scripted(&generator), &owner, None, ReportStyle::Narrative)
            .await
            .unwrap();
        assert!(!fresh.cached);
        assert_eq!(fresh.report, ReportPayload::Narrative { text: "second".into() });
    }
}
