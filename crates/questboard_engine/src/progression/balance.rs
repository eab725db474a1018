//! Category balance scoring.
//!
//! Scores how evenly a user's completed tasks are spread across the three
//! work categories and suggests the least-used one when the gap is large.

use questboard_shared::{WorkCategory, WorkTotals};
use serde::{Deserialize, Serialize};

/// Minimum gap (in tasks) between most- and least-used categories before a
/// recommendation is made
pub const RECOMMENDATION_SPREAD: u64 = 5;

/// Balance score penalty per point of mean absolute deviation
const DEVIATION_WEIGHT: f64 = 2.0;

/// Tie-break order when several categories share the lowest count
const TIE_BREAK: [WorkCategory; 3] = [
    WorkCategory::Community,
    WorkCategory::Corporate,
    WorkCategory::Freelance,
];

/// One category's share of completed work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: WorkCategory,
    pub tasks: u64,
    /// Percentage of all completed tasks
    pub percentage: f64,
}

/// Suggested category to try next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecommendation {
    pub category: WorkCategory,
    pub reason: String,
}

/// Balance view across work categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecommendations {
    pub distribution: Vec<CategoryShare>,
    /// 100 = perfectly even split
    pub balance_score: u8,
    pub recommendation: Option<CategoryRecommendation>,
}

impl Default for CategoryRecommendations {
    fn default() -> Self {
        Self {
            distribution: Vec::new(),
            balance_score: 100,
            recommendation: None,
        }
    }
}

/// Score category balance and pick a recommendation
pub fn category_recommendations(totals: &WorkTotals) -> CategoryRecommendations {
    let counts: Vec<(WorkCategory, u64)> = WorkCategory::ALL
        .iter()
        .map(|c| (*c, totals.completed_in(*c)))
        .collect();
    let total: u64 = counts.iter().map(|(_, n)| n).sum();

    let distribution: Vec<CategoryShare> = counts
        .iter()
        .map(|(category, tasks)| CategoryShare {
            category: *category,
            tasks: *tasks,
            percentage: if total == 0 {
                0.0
            } else {
                *tasks as f64 * 100.0 / total as f64
            },
        })
        .collect();

    if total == 0 {
        return CategoryRecommendations {
            distribution,
            ..Default::default()
        };
    }

    CategoryRecommendations {
        balance_score: balance_score(&distribution),
        recommendation: recommend(&counts),
        distribution,
    }
}

/// 100 minus twice the mean absolute deviation from an even split
fn balance_score(distribution: &[CategoryShare]) -> u8 {
    let even = 100.0 / distribution.len() as f64;
    let mad = distribution
        .iter()
        .map(|s| (s.percentage - even).abs())
        .sum::<f64>()
        / distribution.len() as f64;
    (100.0 - DEVIATION_WEIGHT * mad).clamp(0.0, 100.0).round() as u8
}

fn recommend(counts: &[(WorkCategory, u64)]) -> Option<CategoryRecommendation> {
    let (most_category, most) = counts.iter().copied().max_by_key(|(_, n)| *n)?;
    let least = counts.iter().map(|(_, n)| *n).min()?;
    if most - least < RECOMMENDATION_SPREAD {
        return None;
    }

    let category = TIE_BREAK
        .iter()
        .copied()
        .find(|c| counts.iter().any(|(cc, n)| cc == c && *n == least))?;

    Some(CategoryRecommendation {
        category,
        reason: format!(
            "You have completed {} more {} tasks than {} tasks. Try {} work to balance your profile.",
            most - least,
            most_category.slug(),
            category.slug(),
            category.slug()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use questboard_shared::UserStatsSnapshot;

    fn totals(freelance: u64, community: u64, corporate: u64) -> WorkTotals {
        WorkTotals::from_snapshot(
            &UserStatsSnapshot::new("u1")
                .with_category_tasks(WorkCategory::Freelance, freelance)
                .with_category_tasks(WorkCategory::Community, community)
                .with_category_tasks(WorkCategory::Corporate, corporate),
        )
    }

    #[test]
    fn test_even_split_scores_100() {
        let recs = category_recommendations(&totals(7, 7, 7));
        assert_eq!(recs.balance_score, 100);
        assert!(recs.recommendation.is_none());
    }

    #[test]
    fn test_lopsided_split() {
        let recs = category_recommendations(&totals(20, 0, 0));
        assert!(recs.balance_score < 50, "score was {}", recs.balance_score);
        assert_eq!(recs.balance_score, 11);

        let rec = recs.recommendation.unwrap();
        assert_ne!(rec.category, WorkCategory::Freelance);
        assert_eq!(rec.category, WorkCategory::Community);
        assert!(rec.reason.contains("20 more freelance tasks"));
    }

    #[test]
    fn test_small_spread_no_recommendation() {
        let recs = category_recommendations(&totals(6, 2, 3));
        assert!(recs.recommendation.is_none());
        assert!(recs.balance_score < 100);
    }

    #[test]
    fn test_spread_threshold_inclusive() {
        let recs = category_recommendations(&totals(5, 0, 3));
        let rec = recs.recommendation.unwrap();
        assert_eq!(rec.category, WorkCategory::Community);

        let recs = category_recommendations(&totals(10, 8, 5));
        assert_eq!(recs.recommendation.unwrap().category, WorkCategory::Corporate);
    }

    #[test]
    fn test_no_tasks_is_neutral() {
        let recs = category_recommendations(&WorkTotals::default());
        assert_eq!(recs.balance_score, 100);
        assert!(recs.recommendation.is_none());
        assert_eq!(recs.distribution.len(), 3);
        assert!(recs.distribution.iter().all(|s| s.percentage == 0.0));
    }

    #[test]
    fn test_distribution_percentages() {
        let recs = category_recommendations(&totals(1, 1, 2));
        let pct: f64 = recs.distribution.iter().map(|s| s.percentage).sum();
        assert!((pct - 100.0).abs() < 1e-9);
        assert_eq!(recs.distribution[2].category, WorkCategory::Corporate);
        assert!((recs.distribution[2].percentage - 50.0).abs() < 1e-9);
    }
}
