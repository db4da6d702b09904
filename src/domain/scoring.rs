use crate::domain::anchors::{AnchorKey, ANCHORS, MAX_LIKERT, MIN_LIKERT, QUESTION_COUNT, QUESTIONS_PER_ANCHOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("question index {0} does not exist")]
    UnknownQuestion(usize),
    #[error("submission is missing {} of {QUESTION_COUNT} answers", .missing.len())]
    IncompleteSubmission { missing: Vec<usize> },
    #[error("answer {value} for question {index} is outside {MIN_LIKERT}..={MAX_LIKERT}")]
    OutOfRangeAnswer { index: usize, value: i64 },
}

/// Raw survey answers keyed by question index. Values are kept wide so that
/// out-of-range input reaches validation instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurveyAnswers(BTreeMap<usize, i64>);

impl SurveyAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, value: i64) {
        self.0.insert(index, value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.0.get(&index).copied()
    }

    /// Checks the answer set is complete and in range before any scoring.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if let Some(&index) = self.0.keys().find(|&&idx| idx >= QUESTION_COUNT) {
            return Err(ScoringError::UnknownQuestion(index));
        }

        let missing: Vec<usize> = (0..QUESTION_COUNT)
            .filter(|idx| !self.0.contains_key(idx))
            .collect();
        if !missing.is_empty() {
            return Err(ScoringError::IncompleteSubmission { missing });
        }

        if let Some((&index, &value)) = self
            .0
            .iter()
            .find(|(_, &v)| !(MIN_LIKERT..=MAX_LIKERT).contains(&v))
        {
            return Err(ScoringError::OutOfRangeAnswer { index, value });
        }
        Ok(())
    }
}

impl FromIterator<(usize, i64)> for SurveyAnswers {
    fn from_iter<T: IntoIterator<Item = (usize, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-category scores, always holding all 8 categories once built by this module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryScores(BTreeMap<AnchorKey, f64>);

impl CategoryScores {
    pub fn from_fn(mut f: impl FnMut(AnchorKey) -> f64) -> Self {
        Self(ANCHORS.iter().map(|a| (*a, f(*a))).collect())
    }

    pub fn get(&self, anchor: AnchorKey) -> f64 {
        self.0.get(&anchor).copied().unwrap_or(0.0)
    }

    /// Iterates in fixed category order.
    pub fn iter(&self) -> impl Iterator<Item = (AnchorKey, f64)> + '_ {
        ANCHORS.iter().map(move |a| (*a, self.get(*a)))
    }

    /// Highest score; ties resolve to the earliest category in fixed order.
    pub fn top_anchor(&self) -> AnchorKey {
        let mut best = ANCHORS[0];
        let mut best_score = self.get(best);
        for (anchor, score) in self.iter().skip(1) {
            if score > best_score {
                best = anchor;
                best_score = score;
            }
        }
        best
    }

    /// Categories sorted by score descending, ties in fixed order.
    pub fn ranked(&self) -> Vec<(AnchorKey, f64)> {
        let mut ranked: Vec<(AnchorKey, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub scores: CategoryScores,
    pub top_anchor: AnchorKey,
}

/// Round to 2 decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn score(answers: &SurveyAnswers) -> Result<ScoreOutcome, ScoringError> {
    answers.validate()?;

    let scores = CategoryScores::from_fn(|anchor| {
        let sum: i64 = anchor
            .question_indices()
            .iter()
            .map(|idx| answers.get(*idx).unwrap_or_default())
            .sum();
        round2(sum as f64 / QUESTIONS_PER_ANCHOR as f64)
    });
    let top_anchor = scores.top_anchor();

    Ok(ScoreOutcome { scores, top_anchor })
}

#[cfg(test)]
pub(crate) fn uniform_answers(value: i64) -> SurveyAnswers {
    (0..QUESTION_COUNT).map(|idx| (idx, value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tf_heavy() -> SurveyAnswers {
        let tf = AnchorKey::TechnicalFunctional.question_indices();
        (0..QUESTION_COUNT)
            .map(|idx| (idx, if tf.contains(&idx) { 6 } else { 1 }))
            .collect()
    }

    #[test]
    fn technical_answers_put_tf_on_top() {
        let outcome = score(&tf_heavy()).unwrap();
        assert_eq!(outcome.scores.get(AnchorKey::TechnicalFunctional), 6.0);
        for anchor in ANCHORS.iter().skip(1) {
            assert_eq!(outcome.scores.get(*anchor), 1.0);
        }
        assert_eq!(outcome.top_anchor, AnchorKey::TechnicalFunctional);
        assert_eq!(outcome.top_anchor.code(), "TF");
    }

    #[test]
    fn scoring_is_deterministic() {
        let answers: SurveyAnswers = (0..QUESTION_COUNT)
            .map(|idx| (idx, (idx as i64 * 7 % 6) + 1))
            .collect();
        assert_eq!(score(&answers).unwrap(), score(&answers).unwrap());
    }

    #[test]
    fn scores_stay_within_likert_range() {
        for seed in 0..20i64 {
            let answers: SurveyAnswers = (0..QUESTION_COUNT)
                .map(|idx| (idx, ((idx as i64 + seed) * 5 % 6) + 1))
                .collect();
            let outcome = score(&answers).unwrap();
            for (_, value) in outcome.scores.iter() {
                assert!((1.0..=6.0).contains(&value), "{value} out of range");
            }
            let max = outcome.scores.iter().map(|(_, v)| v).fold(f64::MIN, f64::max);
            assert_eq!(outcome.scores.get(outcome.top_anchor), max);
        }
    }

    #[test]
    fn flat_profile_resolves_to_first_category() {
        let outcome = score(&uniform_answers(4)).unwrap();
        assert!(outcome.scores.iter().all(|(_, v)| v == 4.0));
        assert_eq!(outcome.top_anchor, AnchorKey::TechnicalFunctional);
        assert_eq!(score(&uniform_answers(4)).unwrap().top_anchor, outcome.top_anchor);
    }

    #[test]
    fn tie_between_later_categories_picks_earlier_one() {
        let mut answers = uniform_answers(2);
        for idx in AnchorKey::Service.question_indices() {
            answers.insert(idx, 5);
        }
        for idx in AnchorKey::Autonomy.question_indices() {
            answers.insert(idx, 5);
        }
        assert_eq!(score(&answers).unwrap().top_anchor, AnchorKey::Autonomy);
    }

    #[test]
    fn means_are_rounded_to_two_decimals() {
        let mut answers = uniform_answers(1);
        // 6 + 5 + 5 + 5 + 5 = 26 -> 5.2
        let idx = AnchorKey::Lifestyle.question_indices();
        answers.insert(idx[0], 6);
        for i in &idx[1..] {
            answers.insert(*i, 5);
        }
        assert_eq!(score(&answers).unwrap().scores.get(AnchorKey::Lifestyle), 5.2);
        assert_eq!(round2(2.3456), 2.35);
        assert_eq!(round2(3.333333), 3.33);
    }

    #[test]
    fn rejects_incomplete_submission() {
        let answers: SurveyAnswers = (0..39).map(|idx| (idx, 3)).collect();
        match score(&answers) {
            Err(ScoringError::IncompleteSubmission { missing }) => assert_eq!(missing, vec![39]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            score(&SurveyAnswers::new()),
            Err(ScoringError::IncompleteSubmission { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut answers = uniform_answers(3);
        answers.insert(12, 7);
        assert_eq!(
            score(&answers),
            Err(ScoringError::OutOfRangeAnswer { index: 12, value: 7 })
        );
        answers.insert(12, 0);
        assert!(matches!(score(&answers), Err(ScoringError::OutOfRangeAnswer { .. })));
    }

    #[test]
    fn rejects_unknown_question_index() {
        let mut answers = uniform_answers(3);
        answers.insert(40, 3);
        assert_eq!(score(&answers), Err(ScoringError::UnknownQuestion(40)));
    }

    #[test]
    fn answers_deserialize_from_string_keys() {
        let json = serde_json::json!({ "0": 6, "8": 1 });
        let answers: SurveyAnswers = serde_json::from_value(json).unwrap();
        assert_eq!(answers.get(0), Some(6));
        assert_eq!(answers.len(), 2);
    }
}
