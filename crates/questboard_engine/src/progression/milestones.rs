//! Milestone Catalog
//!
//! Builds the full milestone list from the configured threshold ladders and a
//! statistics snapshot. The catalog is a pure function of its inputs: the
//! same statistics always yield the same milestones in the same order
//! (XP, trust, RWIS, tasks, level, then one ladder per work category).

use crate::config::{CompletionRule, LadderStep, MilestoneConfig};
use questboard_shared::{
    Milestone, MilestoneCategory, MilestoneReward, UserStatsSnapshot, WorkCategory, WorkTotals,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Statistics a catalog is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInputs {
    pub snapshot: UserStatsSnapshot,
    pub totals: WorkTotals,
}

impl ProgressInputs {
    pub fn new(snapshot: UserStatsSnapshot, totals: WorkTotals) -> Self {
        Self { snapshot, totals }
    }

    /// Inputs with totals derived from the snapshot itself
    pub fn from_snapshot(snapshot: UserStatsSnapshot) -> Self {
        let totals = WorkTotals::from_snapshot(&snapshot);
        Self { snapshot, totals }
    }
}

/// Catalog split for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestonePartition {
    pub active: Vec<Milestone>,
    pub completed: Vec<Milestone>,
    pub upcoming: Vec<Milestone>,
    /// First incomplete milestone of each milestone category
    pub next_by_category: Vec<Milestone>,
}

/// Builds and evaluates milestone catalogs
#[derive(Debug, Clone, Default)]
pub struct MilestoneCatalog {
    config: MilestoneConfig,
}

impl MilestoneCatalog {
    pub fn new(mut config: MilestoneConfig) -> Self {
        config.normalize();
        Self { config }
    }

    pub fn config(&self) -> &MilestoneConfig {
        &self.config
    }

    /// Every milestone, evaluated against `inputs`
    pub fn build(&self, inputs: &ProgressInputs) -> Vec<Milestone> {
        let s = &inputs.snapshot;
        let mut catalog = Vec::new();

        let ladders = [
            (MilestoneCategory::Xp, &self.config.xp, s.xp_points),
            (MilestoneCategory::TrustScore, &self.config.trust_score, s.trust_score),
            (MilestoneCategory::Rwis, &self.config.rwis, s.rwis_score),
            (MilestoneCategory::Tasks, &self.config.tasks, inputs.totals.total_tasks),
            (MilestoneCategory::Level, &self.config.level, s.current_level.max(1) as u64),
        ];
        for (category, ladder, current) in ladders {
            for step in ladder {
                catalog.push(stat_milestone(category, step, current));
            }
        }

        for work in WorkCategory::ALL {
            let current = inputs.totals.completed_in(work);
            for step in &self.config.category {
                catalog.push(category_milestone(work, step, current));
            }
        }

        catalog
    }

    /// Split a catalog into active, completed, upcoming and per-category next
    pub fn partition(&self, catalog: &[Milestone]) -> MilestonePartition {
        let active = catalog
            .iter()
            .filter(|m| !m.completed && m.progress > 0)
            .cloned()
            .collect();

        let completed: Vec<&Milestone> = catalog.iter().filter(|m| m.completed).collect();
        let skip = completed.len().saturating_sub(self.config.completed_limit);
        let completed = completed.into_iter().skip(skip).cloned().collect();

        let upcoming = catalog
            .iter()
            .filter(|m| !m.completed && m.progress == 0)
            .take(self.config.upcoming_limit)
            .cloned()
            .collect();

        let next_by_category = MilestoneCategory::ALL
            .iter()
            .filter_map(|c| catalog.iter().find(|m| m.category == *c && !m.completed))
            .cloned()
            .collect();

        MilestonePartition {
            active,
            completed,
            upcoming,
            next_by_category,
        }
    }

    /// Milestones hit exactly by the current statistics
    pub fn exact_completions(&self, catalog: &[Milestone]) -> Vec<Milestone> {
        catalog.iter().filter(|m| m.is_exact_hit()).cloned().collect()
    }

    /// Milestones completed in `after` that were not completed in `before`
    pub fn crossed_completions(
        &self,
        before: &ProgressInputs,
        after: &ProgressInputs,
    ) -> Vec<Milestone> {
        let already: HashSet<String> = self
            .build(before)
            .into_iter()
            .filter(|m| m.completed)
            .map(|m| m.id)
            .collect();

        self.build(after)
            .into_iter()
            .filter(|m| m.completed && !already.contains(&m.id))
            .collect()
    }

    /// Newly completed milestones under the configured rule.
    ///
    /// The crossed rule needs the statistics from before the update; without
    /// them the exact rule is used.
    pub fn newly_completed(
        &self,
        current: &ProgressInputs,
        previous: Option<&ProgressInputs>,
    ) -> Vec<Milestone> {
        match (self.config.completion_rule, previous) {
            (CompletionRule::Crossed, Some(before)) => self.crossed_completions(before, current),
            _ => self.exact_completions(&self.build(current)),
        }
    }
}

fn stat_milestone(category: MilestoneCategory, step: &LadderStep, current: u64) -> Milestone {
    let target = step.target;
    let (name, description) = match category {
        MilestoneCategory::Xp => (
            format!("XP Milestone: {}", target),
            format!("Earn {} total experience points", target),
        ),
        MilestoneCategory::TrustScore => (
            format!("Trusted: {}", target),
            format!("Reach a trust score of {}", target),
        ),
        MilestoneCategory::Rwis => (
            format!("Impact: {}", target),
            format!("Reach a real-world impact score of {}", target),
        ),
        MilestoneCategory::Tasks => (
            format!("Tasks Completed: {}", target),
            format!("Complete {} tasks", target),
        ),
        MilestoneCategory::Level => (
            format!("Level {}", target),
            format!("Reach level {}", target),
        ),
        MilestoneCategory::Category => (
            format!("Category Milestone: {}", target),
            format!("Complete {} tasks in one category", target),
        ),
    };

    Milestone {
        id: format!("{}_{}", category.id_prefix(), target),
        name,
        description,
        category,
        work_category: None,
        current_value: current,
        target_value: target,
        progress: Milestone::progress_for(current, target),
        completed: current >= target,
        reward: reward_for(&step.reward, None),
    }
}

fn category_milestone(work: WorkCategory, step: &LadderStep, current: u64) -> Milestone {
    let target = step.target;
    Milestone {
        id: format!("category_{}_{}", work.slug(), target),
        name: format!("{} Tasks: {}", work.label(), target),
        description: format!("Complete {} {} tasks", target, work.slug()),
        category: MilestoneCategory::Category,
        work_category: Some(work),
        current_value: current,
        target_value: target,
        progress: Milestone::progress_for(current, target),
        completed: current >= target,
        reward: reward_for(&step.reward, Some(work)),
    }
}

/// Empty rewards become `None`; `{category}` placeholders are filled in
fn reward_for(reward: &MilestoneReward, work: Option<WorkCategory>) -> Option<MilestoneReward> {
    if reward.is_empty() {
        return None;
    }
    let mut reward = reward.clone();
    if let Some(work) = work {
        let fill = |s: &mut Option<String>| {
            if let Some(v) = s.as_mut() {
                *v = v.replace("{category}", work.slug());
            }
        };
        fill(&mut reward.badge);
        fill(&mut reward.zone_unlock);
    }
    Some(reward)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(xp: u64, trust: u64, rwis: u64, level: u32) -> ProgressInputs {
        ProgressInputs::from_snapshot(
            UserStatsSnapshot::new("u1")
                .with_points(xp, trust, rwis)
                .with_level(level),
        )
    }

    fn find<'a>(catalog: &'a [Milestone], id: &str) -> &'a Milestone {
        catalog.iter().find(|m| m.id == id).unwrap()
    }

    #[test]
    fn test_catalog_size_and_order() {
        let catalog = MilestoneCatalog::default();
        let c = catalog.config();
        let expected = c.xp.len()
            + c.trust_score.len()
            + c.rwis.len()
            + c.tasks.len()
            + c.level.len()
            + 3 * c.category.len();

        let built = catalog.build(&inputs(0, 0, 0, 1));
        assert_eq!(built.len(), expected);
        assert_eq!(built[0].id, "xp_100");
        assert_eq!(built.last().unwrap().id, "category_corporate_100");
    }

    #[test]
    fn test_progress_and_completion() {
        let catalog = MilestoneCatalog::default();
        let built = catalog.build(&inputs(250, 10, 0, 3));

        let xp100 = find(&built, "xp_100");
        assert!(xp100.completed);
        assert_eq!(xp100.progress, 100);

        let xp500 = find(&built, "xp_500");
        assert!(!xp500.completed);
        assert_eq!(xp500.progress, 50);
        assert_eq!(xp500.current_value, 250);

        let trust10 = find(&built, "trust_10");
        assert!(trust10.is_exact_hit());

        let level5 = find(&built, "level_5");
        assert_eq!(level5.progress, 60);

        for m in &built {
            assert!(m.progress <= 100);
            if m.current_value == m.target_value {
                assert!(m.completed && m.progress == 100);
            }
        }
    }

    #[test]
    fn test_category_milestones_use_totals() {
        let catalog = MilestoneCatalog::default();
        let snapshot = UserStatsSnapshot::new("u1").with_category_tasks(WorkCategory::Community, 10);
        let built = catalog.build(&ProgressInputs::from_snapshot(snapshot));

        let m = find(&built, "category_community_10");
        assert!(m.completed);
        assert_eq!(m.work_category, Some(WorkCategory::Community));
        let reward = m.reward.as_ref().unwrap();
        assert_eq!(reward.badge.as_deref(), Some("community_specialist"));

        assert!(!find(&built, "category_freelance_5").completed);
        assert!(find(&built, "tasks_10").completed);
    }

    #[test]
    fn test_partition() {
        let catalog = MilestoneCatalog::default();
        let built = catalog.build(&inputs(600, 0, 0, 1));
        let part = catalog.partition(&built);

        let completed_ids: Vec<_> = part.completed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(completed_ids, vec!["xp_100", "xp_500"]);
        assert!(part.active.iter().all(|m| !m.completed && m.progress > 0));
        assert!(part.active.iter().any(|m| m.id == "xp_1000"));
        assert_eq!(part.upcoming.len(), 5);
        assert!(part.upcoming.iter().all(|m| m.progress == 0));
        assert_eq!(part.next_by_category[0].id, "xp_1000");
        assert_eq!(part.next_by_category.len(), MilestoneCategory::ALL.len());
    }

    #[test]
    fn test_completed_capped_to_last_ten() {
        let catalog = MilestoneCatalog::default();
        let built = catalog.build(&inputs(1_000_000, 1_000, 10_000, 30));
        let total_completed = built.iter().filter(|m| m.completed).count();
        assert!(total_completed > 10);

        let part = catalog.partition(&built);
        assert_eq!(part.completed.len(), 10);
        let last_completed = built.iter().filter(|m| m.completed).last().unwrap();
        assert_eq!(part.completed.last().unwrap().id, last_completed.id);
    }

    #[test]
    fn test_exact_completions() {
        let catalog = MilestoneCatalog::default();
        let exact = catalog.exact_completions(&catalog.build(&inputs(100, 0, 0, 1)));
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, "xp_100");

        // Jumping past a threshold is not an exact hit
        let skipped = catalog.exact_completions(&catalog.build(&inputs(300, 0, 0, 1)));
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_crossed_completions() {
        let catalog = MilestoneCatalog::default();
        let before = inputs(90, 0, 0, 1);
        let after = inputs(300, 0, 0, 2);

        let crossed = catalog.crossed_completions(&before, &after);
        let ids: Vec<_> = crossed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["xp_100"]);

        assert!(catalog.crossed_completions(&after, &after).is_empty());
    }

    #[test]
    fn test_newly_completed_respects_rule() {
        let before = inputs(90, 0, 0, 1);
        let after = inputs(300, 0, 0, 1);

        let exact = MilestoneCatalog::default();
        assert!(exact.newly_completed(&after, Some(&before)).is_empty());

        let crossed = MilestoneCatalog::new(MilestoneConfig {
            completion_rule: CompletionRule::Crossed,
            ..MilestoneConfig::default()
        });
        assert_eq!(crossed.newly_completed(&after, Some(&before)).len(), 1);
        // Without a previous snapshot the exact rule applies
        assert!(crossed.newly_completed(&after, None).is_empty());
    }

    #[test]
    fn test_catalog_deterministic() {
        let catalog = MilestoneCatalog::default();
        let a = catalog.build(&inputs(777, 33, 120, 4));
        let b = catalog.build(&inputs(777, 33, 120, 4));
        assert_eq!(a, b);
    }
}
