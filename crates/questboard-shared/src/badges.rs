//! Badge catalog seam.
//!
//! Badge definitions and unlock decisions belong to an external catalog. The
//! progression engine only asks which badges a user has earned and which ones
//! the catalog considers unlockable next. `StaticBadgeCatalog` is a simple
//! in-process catalog with threshold criteria, used by tests and single-node
//! deployments.

use crate::category::WorkCategory;
use crate::stats::UserStatsSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Threshold that makes a badge unlockable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BadgeCriterion {
    MinXp(u64),
    MinTrust(u64),
    MinRwis(u64),
    MinTasks(u64),
    MinLevel(u32),
    MinCategoryTasks(WorkCategory, u64),
}

impl BadgeCriterion {
    pub fn is_met(&self, snapshot: &UserStatsSnapshot) -> bool {
        match self {
            Self::MinXp(n) => snapshot.xp_points >= *n,
            Self::MinTrust(n) => snapshot.trust_score >= *n,
            Self::MinRwis(n) => snapshot.rwis_score >= *n,
            Self::MinTasks(n) => snapshot.total_tasks() >= *n,
            Self::MinLevel(n) => snapshot.current_level >= *n,
            Self::MinCategoryTasks(category, n) => snapshot.tasks_in(*category) >= *n,
        }
    }
}

/// Badge as defined by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub criterion: BadgeCriterion,
}

impl BadgeDefinition {
    pub fn new(id: &str, name: &str, description: &str, criterion: BadgeCriterion) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            criterion,
        }
    }
}

/// Badge a user already holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    pub badge_id: String,
    pub name: String,
    pub earned_at: DateTime<Utc>,
}

/// External badge catalog
pub trait BadgeCatalog: Send + Sync {
    /// All badge definitions, in catalog order
    fn definitions(&self) -> Vec<BadgeDefinition>;

    /// Badges the user has earned
    fn earned(&self, user_id: &str) -> Vec<EarnedBadge>;

    /// Whether the user can unlock `badge` now
    fn is_unlockable(&self, badge: &BadgeDefinition, snapshot: &UserStatsSnapshot) -> bool;
}

/// Default badge definitions
pub fn default_badges() -> Vec<BadgeDefinition> {
    use BadgeCriterion::*;
    vec![
        BadgeDefinition::new("first_quest", "First Quest", "Complete your first task", MinTasks(1)),
        BadgeDefinition::new("task_runner", "Task Runner", "Complete 10 tasks", MinTasks(10)),
        BadgeDefinition::new("quest_veteran", "Quest Veteran", "Complete 50 tasks", MinTasks(50)),
        BadgeDefinition::new("xp_1k", "Rising Star", "Earn 1,000 XP", MinXp(1_000)),
        BadgeDefinition::new("xp_5k", "Seasoned", "Earn 5,000 XP", MinXp(5_000)),
        BadgeDefinition::new("trusted_member", "Trusted Member", "Reach 50 trust", MinTrust(50)),
        BadgeDefinition::new("pillar_of_trust", "Pillar of Trust", "Reach 100 trust", MinTrust(100)),
        BadgeDefinition::new("impact_maker", "Impact Maker", "Reach 250 RWIS", MinRwis(250)),
        BadgeDefinition::new("world_changer", "World Changer", "Reach 1,000 RWIS", MinRwis(1_000)),
        BadgeDefinition::new("seasoned_adventurer", "Seasoned Adventurer", "Reach level 10", MinLevel(10)),
        BadgeDefinition::new(
            "community_specialist",
            "Community Specialist",
            "Complete 10 community tasks",
            MinCategoryTasks(WorkCategory::Community, 10),
        ),
        BadgeDefinition::new(
            "freelance_specialist",
            "Freelance Specialist",
            "Complete 10 freelance tasks",
            MinCategoryTasks(WorkCategory::Freelance, 10),
        ),
        BadgeDefinition::new(
            "corporate_specialist",
            "Corporate Specialist",
            "Complete 10 corporate tasks",
            MinCategoryTasks(WorkCategory::Corporate, 10),
        ),
    ]
}

/// In-process badge catalog backed by threshold criteria
pub struct StaticBadgeCatalog {
    definitions: Vec<BadgeDefinition>,
    earned: RwLock<HashMap<String, Vec<EarnedBadge>>>,
}

impl StaticBadgeCatalog {
    pub fn new(definitions: Vec<BadgeDefinition>) -> Self {
        Self {
            definitions,
            earned: RwLock::new(HashMap::new()),
        }
    }

    /// Record that a user earned a badge. Unknown ids and repeats are ignored.
    pub fn award(&self, user_id: &str, badge_id: &str, at: DateTime<Utc>) -> bool {
        let Some(def) = self.definitions.iter().find(|d| d.id == badge_id) else {
            return false;
        };
        let mut earned = match self.earned.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let list = earned.entry(user_id.to_string()).or_default();
        if list.iter().any(|b| b.badge_id == badge_id) {
            return false;
        }
        list.push(EarnedBadge {
            badge_id: def.id.clone(),
            name: def.name.clone(),
            earned_at: at,
        });
        true
    }

    fn has_earned(&self, user_id: &str, badge_id: &str) -> bool {
        self.earned(user_id).iter().any(|b| b.badge_id == badge_id)
    }
}

impl Default for StaticBadgeCatalog {
    fn default() -> Self {
        Self::new(default_badges())
    }
}

impl BadgeCatalog for StaticBadgeCatalog {
    fn definitions(&self) -> Vec<BadgeDefinition> {
        self.definitions.clone()
    }

    fn earned(&self, user_id: &str) -> Vec<EarnedBadge> {
        let earned = match self.earned.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        earned.get(user_id).cloned().unwrap_or_default()
    }

    fn is_unlockable(&self, badge: &BadgeDefinition, snapshot: &UserStatsSnapshot) -> bool {
        !self.has_earned(&snapshot.user_id, &badge.id) && badge.criterion.is_met(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria() {
        let s = UserStatsSnapshot::new("u1")
            .with_points(1_200, 40, 0)
            .with_category_tasks(WorkCategory::Community, 12);

        assert!(BadgeCriterion::MinXp(1_000).is_met(&s));
        assert!(!BadgeCriterion::MinTrust(50).is_met(&s));
        assert!(BadgeCriterion::MinTasks(10).is_met(&s));
        assert!(BadgeCriterion::MinCategoryTasks(WorkCategory::Community, 10).is_met(&s));
        assert!(!BadgeCriterion::MinCategoryTasks(WorkCategory::Freelance, 1).is_met(&s));
    }

    #[test]
    fn test_award_once() {
        let catalog = StaticBadgeCatalog::default();
        let now = Utc::now();
        assert!(catalog.award("u1", "first_quest", now));
        assert!(!catalog.award("u1", "first_quest", now));
        assert!(!catalog.award("u1", "no_such_badge", now));
        assert_eq!(catalog.earned("u1").len(), 1);
        assert!(catalog.earned("u2").is_empty());
    }

    #[test]
    fn test_earned_badge_not_unlockable() {
        let catalog = StaticBadgeCatalog::default();
        let s = UserStatsSnapshot::new("u1").with_category_tasks(WorkCategory::Freelance, 1);
        let first = catalog
            .definitions()
            .into_iter()
            .find(|d| d.id == "first_quest")
            .unwrap();

        assert!(catalog.is_unlockable(&first, &s));
        catalog.award("u1", "first_quest", Utc::now());
        assert!(!catalog.is_unlockable(&first, &s));
    }
}
