//! Progression Engine
//!
//! Runs the full task completion cycle for one user while holding that
//! user's lock:
//!
//! 1. Load statistics (no statistics: nothing happens)
//! 2. Compute XP, trust score and RWIS
//! 3. Apply the points and the resulting level through the store in one call
//! 4. Apply newly completed milestone rewards
//! 5. Re-evaluate the level again if milestone XP moved it
//!
//! Every store write is idempotent: the task delta is keyed by the task's
//! completion id, milestone rewards by milestone id, and levels are absolute.
//! A cycle that fails partway can be retried with the same `TaskCompletion`.

use crate::config::ProgressionConfig;
use crate::locks::UserLocks;
use crate::progression::{
    LevelCalculator, LevelProgressionResult, RewardCalculator, RwisResult, TrustResult, XpResult,
};
use crate::tracker::MilestoneTracker;
use questboard_shared::{
    BadgeCatalog, Milestone, StatsStore, StoreError, TaskCompletion, TaskDelta,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one task completion produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletionOutcome {
    pub xp: XpResult,
    pub trust: TrustResult,
    pub rwis: RwisResult,
    pub level: LevelProgressionResult,
    /// Milestones completed and rewarded by this call
    pub milestones: Vec<Milestone>,
    /// `true` when the store had already applied this completion id
    #[serde(default)]
    pub replayed: bool,
}

/// Reward, level and milestone orchestration over a statistics store
pub struct ProgressionEngine {
    store: Arc<dyn StatsStore>,
    rewards: RewardCalculator,
    levels: LevelCalculator,
    tracker: MilestoneTracker,
    locks: Arc<UserLocks>,
}

impl ProgressionEngine {
    /// Validate `config` and build an engine over `store`
    pub fn new(
        mut config: ProgressionConfig,
        store: Arc<dyn StatsStore>,
        badges: Arc<dyn BadgeCatalog>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let locks = Arc::new(UserLocks::new());
        let tracker = MilestoneTracker::with_locks(&config, store.clone(), badges, locks.clone());
        Ok(Self {
            store,
            rewards: RewardCalculator::new(config.rewards),
            levels: LevelCalculator::new(config.levels),
            tracker,
            locks,
        })
    }

    /// Engine configured from `QUESTBOARD_CONFIG` or the default config path
    pub fn from_config_file(
        store: Arc<dyn StatsStore>,
        badges: Arc<dyn BadgeCatalog>,
    ) -> anyhow::Result<Self> {
        Self::new(ProgressionConfig::load_default()?, store, badges)
    }

    pub fn rewards(&self) -> &RewardCalculator {
        &self.rewards
    }

    pub fn levels(&self) -> &LevelCalculator {
        &self.levels
    }

    /// Read-side queries, sharing this engine's user locks
    pub fn tracker(&self) -> &MilestoneTracker {
        &self.tracker
    }

    /// Record a completed task for `user_id`.
    ///
    /// Returns `Ok(None)` when the user has no statistics snapshot. On a
    /// retryable store error (`StoreError::is_retryable`) call again with the
    /// same `task`: steps that already landed are skipped, so the task is
    /// counted once.
    pub fn record_task_completion(
        &self,
        user_id: &str,
        task: &TaskCompletion,
    ) -> Result<Option<TaskCompletionOutcome>, StoreError> {
        let result = self
            .locks
            .with_user(user_id, || self.record_locked(user_id, task));
        if let Err(e) = &result {
            if e.is_retryable() {
                warn!(
                    "Task {} for {} interrupted, safe to retry: {}",
                    task.completion_id, user_id, e
                );
            }
        }
        result
    }

    fn record_locked(
        &self,
        user_id: &str,
        task: &TaskCompletion,
    ) -> Result<Option<TaskCompletionOutcome>, StoreError> {
        let Some(before) = self.tracker.inputs(user_id)? else {
            debug!("No statistics for {}, task completion ignored", user_id);
            return Ok(None);
        };
        let start_level = before.snapshot.current_level.max(1);

        let xp = self.rewards.calculate_xp(
            &task.rewards,
            task.category,
            task.quality,
            task.completion_time_ratio,
            start_level,
        );
        let trust = self.rewards.calculate_trust_score(
            &task.rewards,
            task.category,
            task.quality,
            task.on_time,
            task.client_feedback,
        );
        let rwis = self.rewards.calculate_rwis(
            &task.rewards,
            task.category,
            task.quality,
            task.complexity,
        );

        let task_xp = xp.total_xp as u64;
        let delta = TaskDelta {
            completion_id: task.completion_id.clone(),
            category: task.category,
            xp: task_xp,
            trust_score: trust.total_trust_score as u64,
            rwis: rwis.total_rwis as u64,
            rating: task.quality.is_rated().then_some(task.quality.value()),
            level: self
                .levels
                .level_for_xp(before.snapshot.xp_points.saturating_add(task_xp)),
        };
        let application = self.store.apply_task_delta(user_id, &delta)?;
        let replayed = !application.applied;
        if replayed {
            info!(
                "Task {} for {} was already recorded, finishing remaining steps",
                task.completion_id, user_id
            );
        } else {
            info!(
                "Task rewards for {}: +{} XP, +{} trust, +{} RWIS ({})",
                user_id,
                delta.xp,
                delta.trust_score,
                delta.rwis,
                task.category.slug()
            );
        }

        let updated = application.snapshot;
        let mut stored_level = updated.current_level.max(1);
        let mut level = self
            .levels
            .calculate_level_progression(updated.xp_points, start_level);
        if level.new_level > stored_level {
            // Catch up a level write lost by an interrupted earlier attempt
            self.store.set_level(user_id, level.new_level)?;
            stored_level = level.new_level;
        }
        if level.leveled_up {
            info!("{} reached level {} ({})", user_id, level.new_level, level.title);
        }

        // A replay compares against the current statistics only, because
        // `before` already includes this task.
        let previous = (!replayed).then_some(&before);
        let milestones = self.tracker.apply_completions(user_id, previous)?;

        let milestone_xp = milestones
            .iter()
            .filter_map(|m| m.reward.as_ref().and_then(|r| r.xp))
            .any(|xp| xp > 0);
        if milestone_xp {
            if let Some(after) = self.store.load(user_id)? {
                level = self
                    .levels
                    .calculate_level_progression(after.xp_points, start_level);
                if level.new_level > stored_level {
                    self.store.set_level(user_id, level.new_level)?;
                    info!(
                        "{} reached level {} from milestone rewards",
                        user_id, level.new_level
                    );
                }
            }
        }

        Ok(Some(TaskCompletionOutcome {
            xp,
            trust,
            rwis,
            level,
            milestones,
            replayed,
        }))
    }
}
