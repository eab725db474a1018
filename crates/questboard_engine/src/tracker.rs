//! Milestone Tracker
//!
//! Read side of the progression system plus milestone reward application.
//! Statistics come from a `StatsStore`, badges from a `BadgeCatalog`.
//!
//! A user without a statistics snapshot gets empty or neutral results from
//! every read operation.

use crate::config::ProgressionConfig;
use crate::locks::UserLocks;
use crate::progression::{
    category_recommendations, CategoryRecommendations, LevelCalculator, LevelProgress,
    MilestoneCatalog, ProgressInputs,
};
use chrono::{DateTime, Duration, Utc};
use questboard_shared::{
    BadgeCatalog, BadgeDefinition, EarnedBadge, Milestone, StatsStore, StoreError, WorkTotals,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a progress page shows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSummary {
    pub active: Vec<Milestone>,
    pub completed: Vec<Milestone>,
    pub upcoming: Vec<Milestone>,
    pub next_by_category: Vec<Milestone>,
    /// Badges earned recently, newest first
    pub recent_badges: Vec<EarnedBadge>,
    /// Unearned badges the catalog considers unlockable
    pub next_badges: Vec<BadgeDefinition>,
    pub total_milestones: usize,
    pub total_completed: usize,
}

/// Milestone and progress queries for users
pub struct MilestoneTracker {
    store: Arc<dyn StatsStore>,
    badges: Arc<dyn BadgeCatalog>,
    catalog: MilestoneCatalog,
    levels: LevelCalculator,
    locks: Arc<UserLocks>,
}

impl MilestoneTracker {
    /// Tracker over `config`'s milestone and level sections. Ladders and
    /// title bands are normalized here; run `ProgressionConfig::validate`
    /// first to reject invalid curves.
    pub fn new(
        config: &ProgressionConfig,
        store: Arc<dyn StatsStore>,
        badges: Arc<dyn BadgeCatalog>,
    ) -> Self {
        Self::with_locks(config, store, badges, Arc::new(UserLocks::new()))
    }

    /// Tracker sharing a lock table with other components
    pub fn with_locks(
        config: &ProgressionConfig,
        store: Arc<dyn StatsStore>,
        badges: Arc<dyn BadgeCatalog>,
        locks: Arc<UserLocks>,
    ) -> Self {
        Self {
            store,
            badges,
            catalog: MilestoneCatalog::new(config.milestones.clone()),
            levels: LevelCalculator::new(config.levels.clone()),
            locks,
        }
    }

    pub fn catalog(&self) -> &MilestoneCatalog {
        &self.catalog
    }

    /// Current statistics with aggregate totals, if the user has any
    pub fn inputs(&self, user_id: &str) -> Result<Option<ProgressInputs>, StoreError> {
        let Some(snapshot) = self.store.load(user_id)? else {
            return Ok(None);
        };
        let totals = match self.store.work_totals(user_id)? {
            Some(totals) => totals,
            None => WorkTotals::from_snapshot(&snapshot),
        };
        Ok(Some(ProgressInputs::new(snapshot, totals)))
    }

    /// Milestones, recent badges and badge suggestions as of `now`
    pub fn get_user_progression_summary(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressionSummary, StoreError> {
        let Some(inputs) = self.inputs(user_id)? else {
            debug!("No statistics for {}, returning empty summary", user_id);
            return Ok(ProgressionSummary::default());
        };

        let config = self.catalog.config();
        let milestones = self.catalog.build(&inputs);
        let partition = self.catalog.partition(&milestones);

        // recent_badge_days is bounded when the catalog is built
        let cutoff = now
            .checked_sub_signed(Duration::days(config.recent_badge_days))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut recent_badges: Vec<EarnedBadge> = self
            .badges
            .earned(user_id)
            .into_iter()
            .filter(|b| b.earned_at >= cutoff && b.earned_at <= now)
            .collect();
        recent_badges.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));

        let next_badges = self
            .badges
            .definitions()
            .into_iter()
            .filter(|def| self.badges.is_unlockable(def, &inputs.snapshot))
            .take(config.badge_suggestions)
            .collect();

        Ok(ProgressionSummary {
            total_milestones: milestones.len(),
            total_completed: milestones.iter().filter(|m| m.completed).count(),
            active: partition.active,
            completed: partition.completed,
            upcoming: partition.upcoming,
            next_by_category: partition.next_by_category,
            recent_badges,
            next_badges,
        })
    }

    /// Detect newly completed milestones and apply their rewards.
    ///
    /// Each milestone is reported and rewarded at most once per user, however
    /// many times this is called.
    pub fn check_milestone_completions(&self, user_id: &str) -> Result<Vec<Milestone>, StoreError> {
        self.locks
            .with_user(user_id, || self.apply_completions(user_id, None))
    }

    /// Completion check for callers already holding the user's lock.
    /// `previous` is the statistics from before the update, used by the
    /// crossed completion rule.
    pub(crate) fn apply_completions(
        &self,
        user_id: &str,
        previous: Option<&ProgressInputs>,
    ) -> Result<Vec<Milestone>, StoreError> {
        let Some(current) = self.inputs(user_id)? else {
            return Ok(Vec::new());
        };

        let mut applied = Vec::new();
        for milestone in self.catalog.newly_completed(&current, previous) {
            let reward = milestone.reward.clone().unwrap_or_default();
            if !self.store.apply_milestone_reward(user_id, &milestone.id, &reward)? {
                continue;
            }
            info!(
                "Milestone completed for {}: {} ({}/{})",
                user_id, milestone.id, milestone.current_value, milestone.target_value
            );
            if let Some(badge) = &reward.badge {
                debug!("Milestone {} grants badge {}", milestone.id, badge);
            }
            applied.push(milestone);
        }
        Ok(applied)
    }

    /// Level progress with absolute cumulative XP markers
    pub fn get_level_progress(&self, user_id: &str) -> Result<LevelProgress, StoreError> {
        match self.store.load(user_id)? {
            Some(snapshot) => Ok(self.levels.level_progress(snapshot.xp_points)),
            None => Ok(LevelProgress::default()),
        }
    }

    /// Category balance score and recommendation
    pub fn get_category_recommendations(
        &self,
        user_id: &str,
    ) -> Result<CategoryRecommendations, StoreError> {
        let totals = match self.store.work_totals(user_id)? {
            Some(totals) => totals,
            None => return Ok(CategoryRecommendations::default()),
        };
        Ok(category_recommendations(&totals))
    }
}
