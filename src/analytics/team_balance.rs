use crate::db::ResultStore;
use crate::domain::anchors::{AnchorKey, ANCHORS};
use crate::domain::scoring::{round2, CategoryScores};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

const HIGHLIGHT_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBalance {
    pub member_count: usize,
    pub means: CategoryScores,
    /// All categories, strongest first.
    pub ranking: Vec<AnchorKey>,
    pub strengths: Vec<AnchorKey>,
    /// Weakest first.
    pub gaps: Vec<AnchorKey>,
    pub spread: BTreeMap<AnchorKey, ScoreRange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamBalanceReport {
    pub team_id: Uuid,
    pub member_count: usize,
    pub balance: Option<TeamBalance>,
}

/// Team-wide statistics over member scores. `None` when nobody has a result yet.
pub fn team_balance(members: &[CategoryScores]) -> Option<TeamBalance> {
    if members.is_empty() {
        return None;
    }
    let count = members.len() as f64;

    let means = CategoryScores::from_fn(|anchor| {
        let sum: f64 = members.iter().map(|m| m.get(anchor)).sum();
        round2(sum / count)
    });

    let spread = ANCHORS
        .iter()
        .map(|anchor| {
            let (min, max) = members.iter().map(|m| m.get(*anchor)).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(v), hi.max(v)),
            );
            (*anchor, ScoreRange { min, max })
        })
        .collect();

    let ranking: Vec<AnchorKey> = means.ranked().into_iter().map(|(a, _)| a).collect();
    let strengths = ranking.iter().take(HIGHLIGHT_COUNT).copied().collect();
    let gaps = ranking.iter().rev().take(HIGHLIGHT_COUNT).copied().collect();

    Some(TeamBalance {
        member_count: members.len(),
        means,
        ranking,
        strengths,
        gaps,
        spread,
    })
}

pub async fn build_team_balance(store: &dyn ResultStore, team_id: Uuid) -> Result<TeamBalanceReport> {
    let members = store.list_member_results(team_id).await?;
    let scores: Vec<CategoryScores> = members.into_iter().map(|m| m.scores).collect();
    tracing::debug!("Computing balance for team {} over {} results", team_id, scores.len());

    Ok(TeamBalanceReport {
        team_id,
        member_count: scores.len(),
        balance: team_balance(&scores),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores_with(values: &[(AnchorKey, f64)], rest: f64) -> CategoryScores {
        CategoryScores::from_fn(|anchor| {
            values
                .iter()
                .find(|(a, _)| *a == anchor)
                .map(|(_, v)| *v)
                .unwrap_or(rest)
        })
    }

    #[test]
    fn empty_team_has_no_balance() {
        assert!(team_balance(&[]).is_none());
    }

    #[test]
    fn mean_of_two_members() {
        let a = scores_with(&[(AnchorKey::TechnicalFunctional, 6.0)], 3.0);
        let b = scores_with(&[(AnchorKey::TechnicalFunctional, 2.0)], 3.0);
        let balance = team_balance(&[a, b]).unwrap();
        assert_eq!(balance.member_count, 2);
        assert_eq!(balance.means.get(AnchorKey::TechnicalFunctional), 4.0);
        assert_eq!(
            balance.spread[&AnchorKey::TechnicalFunctional],
            ScoreRange { min: 2.0, max: 6.0 }
        );
    }

    #[test]
    fn means_stay_within_member_bounds() {
        let members: Vec<CategoryScores> = (0..7)
            .map(|m| CategoryScores::from_fn(|a| round2(1.0 + ((a.position() * 3 + m * 5) % 26) as f64 / 5.0)))
            .collect();
        let balance = team_balance(&members).unwrap();
        for anchor in ANCHORS {
            let mean = balance.means.get(anchor);
            let range = balance.spread[&anchor];
            assert!(range.min <= mean && mean <= range.max, "{anchor}: {mean} not in {range:?}");
        }
    }

    #[test]
    fn strengths_and_gaps_follow_ranking() {
        let member = scores_with(
            &[
                (AnchorKey::EntrepreneurialCreativity, 5.8),
                (AnchorKey::PureChallenge, 5.2),
                (AnchorKey::Security, 1.4),
                (AnchorKey::Lifestyle, 2.0),
            ],
            3.0,
        );
        let balance = team_balance(&[member]).unwrap();
        assert_eq!(
            balance.strengths,
            vec![AnchorKey::EntrepreneurialCreativity, AnchorKey::PureChallenge]
        );
        assert_eq!(balance.gaps, vec![AnchorKey::Security, AnchorKey::Lifestyle]);
        assert_eq!(balance.ranking.len(), 8);
    }

    #[test]
    fn ties_follow_fixed_category_order() {
        let flat = CategoryScores::from_fn(|_| 3.5);
        let balance = team_balance(&[flat.clone(), flat]).unwrap();
        assert_eq!(balance.ranking, ANCHORS.to_vec());
        assert_eq!(
            balance.strengths,
            vec![AnchorKey::TechnicalFunctional, AnchorKey::GeneralManagerial]
        );
        assert_eq!(balance.gaps, vec![AnchorKey::Lifestyle, AnchorKey::PureChallenge]);
    }

    #[tokio::test]
    async fn project_scoped_results_win_over_personal_ones() {
        use crate::db::memory::MemoryStore;
        use crate::domain::models::ResultOwner;

        let store = MemoryStore::new();
        let (scoped_member, personal_member, newcomer) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let project = store.add_project(Uuid::new_v4());
        let team = store.add_team(project, &[scoped_member, personal_member, newcomer]);

        store.put_scores(
            ResultOwner::personal(scoped_member),
            CategoryScores::from_fn(|_| 1.0),
        );
        store.put_scores(
            ResultOwner {
                user_id: scoped_member,
                project_id: Some(project),
            },
            scores_with(&[(AnchorKey::Autonomy, 6.0)], 5.0),
        );
        store.put_scores(
            ResultOwner::personal(personal_member),
            scores_with(&[(AnchorKey::Autonomy, 4.0)], 3.0),
        );

        let report = build_team_balance(&store, team).await.unwrap();
        assert_eq!(report.team_id, team);
        assert_eq!(report.member_count, 2);
        let balance = report.balance.unwrap();
        assert_eq!(balance.member_count, 2);
        assert_eq!(balance.means.get(AnchorKey::Autonomy), 5.0);
        assert_eq!(balance.means.get(AnchorKey::Service), 4.0);
        assert_eq!(balance.ranking[0], AnchorKey::Autonomy);

        let quiet_team = store.add_team(project, &[newcomer]);
        let empty = build_team_balance(&store, quiet_team).await.unwrap();
        assert_eq!(empty.member_count, 0);
        assert!(empty.balance.is_none());
    }
}
