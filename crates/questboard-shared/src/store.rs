//! Statistics store seam and an in-memory implementation.
//!
//! Every mutating call is atomic per user: a task delta or a milestone reward
//! bundle lands completely or not at all. Task deltas (user id + completion
//! id) and milestone rewards (user id + milestone id) both carry an
//! idempotency key, so a replayed application is a no-op.

use crate::error::StoreError;
use crate::ledger::{idempotency_key, task_key};
use crate::milestone::MilestoneReward;
use crate::stats::{TaskDelta, UserStatsSnapshot, WorkTotals};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Result of applying a task delta
#[derive(Debug, Clone, PartialEq)]
pub struct TaskApplication {
    /// Snapshot after the call
    pub snapshot: UserStatsSnapshot,
    /// `false` when this completion id had already been applied
    pub applied: bool,
}

/// Persistence collaborator for user statistics
pub trait StatsStore: Send + Sync {
    /// Current snapshot, or `None` when the user has no statistics
    fn load(&self, user_id: &str) -> Result<Option<UserStatsSnapshot>, StoreError>;

    /// Aggregate work totals. Defaults to totals derived from the snapshot.
    fn work_totals(&self, user_id: &str) -> Result<Option<WorkTotals>, StoreError> {
        Ok(self.load(user_id)?.map(|s| WorkTotals::from_snapshot(&s)))
    }

    /// Apply one task's points and level exactly once per completion id
    fn apply_task_delta(
        &self,
        user_id: &str,
        delta: &TaskDelta,
    ) -> Result<TaskApplication, StoreError>;

    /// Persist a new level. Absolute, so repeating it is harmless.
    fn set_level(&self, user_id: &str, level: u32) -> Result<(), StoreError>;

    /// Apply a milestone reward exactly once.
    ///
    /// Returns `Ok(false)` when this milestone was already applied for the user.
    fn apply_milestone_reward(
        &self,
        user_id: &str,
        milestone_id: &str,
        reward: &MilestoneReward,
    ) -> Result<bool, StoreError>;
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, UserStatsSnapshot>,
    applied: HashSet<String>,
    tasks: HashSet<String>,
}

/// Store that keeps everything in process memory
#[derive(Default)]
pub struct MemoryStatsStore {
    state: Mutex<MemoryState>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user's snapshot
    pub fn insert(&self, snapshot: UserStatsSnapshot) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.users.insert(snapshot.user_id.clone(), snapshot);
        Ok(())
    }

    /// Number of milestone rewards applied across all users
    pub fn applied_count(&self) -> usize {
        self.lock().map(|s| s.applied.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl StatsStore for MemoryStatsStore {
    fn load(&self, user_id: &str) -> Result<Option<UserStatsSnapshot>, StoreError> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }

    fn apply_task_delta(
        &self,
        user_id: &str,
        delta: &TaskDelta,
    ) -> Result<TaskApplication, StoreError> {
        let mut state = self.lock()?;
        let MemoryState { users, tasks, .. } = &mut *state;
        let snapshot = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;

        let key = task_key(user_id, &delta.completion_id);
        let applied = tasks.insert(key);
        if applied {
            snapshot.apply_task_delta(delta);
        } else {
            debug!("Task delta {} already applied", delta.completion_id);
        }
        Ok(TaskApplication {
            snapshot: snapshot.clone(),
            applied,
        })
    }

    fn set_level(&self, user_id: &str, level: u32) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let snapshot = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        snapshot.set_level(level);
        Ok(())
    }

    fn apply_milestone_reward(
        &self,
        user_id: &str,
        milestone_id: &str,
        reward: &MilestoneReward,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let key = idempotency_key(user_id, milestone_id);
        if state.applied.contains(&key) {
            debug!("Milestone reward {} already applied", key);
            return Ok(false);
        }

        let snapshot = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        snapshot.apply_milestone_reward(reward);
        state.applied.insert(key);
        Ok(true)
    }
}
