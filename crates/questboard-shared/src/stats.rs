//! User statistics snapshots and the deltas applied to them.
//!
//! The snapshot is owned by a store. Calculators read it; stores apply
//! `TaskDelta` and `MilestoneReward` through the methods here so every backend
//! updates the same fields the same way.

use crate::category::WorkCategory;
use crate::milestone::MilestoneReward;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-category work metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMetrics {
    pub tasks_completed: u64,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    /// Running average over rated tasks only
    pub average_rating: f64,
    #[serde(default)]
    pub rated_tasks: u64,
    #[serde(default)]
    pub specializations: Vec<String>,
}

impl CategoryMetrics {
    /// Record one completed task
    pub fn record(&mut self, xp: u64, rating: Option<f64>) {
        self.tasks_completed += 1;
        self.total_xp = self.total_xp.saturating_add(xp);

        if let Some(rating) = rating {
            let n = self.rated_tasks as f64;
            self.average_rating = (self.average_rating * n + rating) / (n + 1.0);
            self.rated_tasks += 1;
        }
    }
}

/// Point-in-time statistics for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsSnapshot {
    pub user_id: String,
    pub trust_score: u64,
    pub rwis_score: u64,
    pub xp_points: u64,
    pub current_level: u32,
    #[serde(default)]
    pub category_stats: BTreeMap<WorkCategory, CategoryMetrics>,
}

impl UserStatsSnapshot {
    /// Fresh level-1 user with no history
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            trust_score: 0,
            rwis_score: 0,
            xp_points: 0,
            current_level: 1,
            category_stats: BTreeMap::new(),
        }
    }

    pub fn with_points(mut self, xp: u64, trust: u64, rwis: u64) -> Self {
        self.xp_points = xp;
        self.trust_score = trust;
        self.rwis_score = rwis;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.current_level = level.max(1);
        self
    }

    /// Set the completed-task count for a category
    pub fn with_category_tasks(mut self, category: WorkCategory, tasks: u64) -> Self {
        self.category_stats.entry(category).or_default().tasks_completed = tasks;
        self
    }

    pub fn category(&self, category: WorkCategory) -> Option<&CategoryMetrics> {
        self.category_stats.get(&category)
    }

    pub fn tasks_in(&self, category: WorkCategory) -> u64 {
        self.category(category).map(|m| m.tasks_completed).unwrap_or(0)
    }

    pub fn total_tasks(&self) -> u64 {
        self.category_stats.values().map(|m| m.tasks_completed).sum()
    }

    /// Apply the points earned by one task. The level only ever rises.
    pub fn apply_task_delta(&mut self, delta: &TaskDelta) {
        self.xp_points = self.xp_points.saturating_add(delta.xp);
        self.current_level = self.current_level.max(delta.level);
        self.trust_score = self.trust_score.saturating_add(delta.trust_score);
        self.rwis_score = self.rwis_score.saturating_add(delta.rwis);
        self.category_stats
            .entry(delta.category)
            .or_default()
            .record(delta.xp, delta.rating);
        self.normalize();
    }

    /// Apply the point part of a milestone reward. Badges and zones are
    /// handled by whoever consumes the returned milestones.
    pub fn apply_milestone_reward(&mut self, reward: &MilestoneReward) {
        if let Some(xp) = reward.xp {
            self.xp_points = self.xp_points.saturating_add(xp as u64);
        }
        if let Some(trust) = reward.trust_score {
            self.trust_score = self.trust_score.saturating_add(trust as u64);
        }
    }

    pub fn set_level(&mut self, level: u32) {
        self.current_level = level.max(1);
    }

    fn normalize(&mut self) {
        if self.current_level == 0 {
            self.current_level = 1;
        }
    }
}

/// Points produced by one completed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDelta {
    /// Id of the task completion that produced these points
    pub completion_id: String,
    pub category: WorkCategory,
    pub xp: u64,
    pub trust_score: u64,
    pub rwis: u64,
    /// Quality rating, when the task was rated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Level reached with these points; 0 leaves the stored level alone
    #[serde(default)]
    pub level: u32,
}

/// Aggregate totals from work history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkTotals {
    pub total_tasks: u64,
    pub by_category: BTreeMap<WorkCategory, u64>,
}

impl WorkTotals {
    /// Derive totals from the per-category metrics of a snapshot
    pub fn from_snapshot(snapshot: &UserStatsSnapshot) -> Self {
        let by_category: BTreeMap<WorkCategory, u64> = WorkCategory::ALL
            .iter()
            .map(|c| (*c, snapshot.tasks_in(*c)))
            .collect();
        Self {
            total_tasks: by_category.values().sum(),
            by_category,
        }
    }

    pub fn completed_in(&self, category: WorkCategory) -> u64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}
