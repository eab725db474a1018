//! File-backed statistics store.
//!
//! Snapshots, applied task completion ids and applied milestone keys live
//! together in one JSON state file, replaced atomically via write-then-rename,
//! so a reward and its idempotency key are always persisted in the same write.
//! Applied rewards are also appended to a JSONL ledger for auditing.
//!
//! Every read-modify-write holds an exclusive `flock` on `stats.lock` in the
//! data directory, so several stores (or processes) sharing a directory do not
//! lose each other's updates.

use crate::error::StoreError;
use crate::ledger::{idempotency_key, task_key, LedgerEntry, RewardLedger};
use crate::milestone::MilestoneReward;
use crate::stats::{TaskDelta, UserStatsSnapshot};
use crate::store::{StatsStore, TaskApplication};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

const STATE_FILE: &str = "stats.json";
const LOCK_FILE: &str = "stats.lock";
const LEDGER_FILE: &str = "milestone_ledger.jsonl";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    users: BTreeMap<String, UserStatsSnapshot>,
    #[serde(default)]
    applied: BTreeSet<String>,
    #[serde(default)]
    tasks: BTreeSet<String>,
}

/// Exclusive advisory lock on a file, released on drop
struct FileLock {
    #[cfg_attr(not(unix), allow(dead_code))]
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            loop {
                // SAFETY: the descriptor stays open for the lifetime of `file`
                if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } == 0 {
                    break;
                }
                let err = std::io::Error::last_os_error();
                if err.kind() != std::io::ErrorKind::Interrupted {
                    return Err(StoreError::Backend(format!(
                        "Failed to lock {}: {}",
                        path.display(),
                        err
                    )));
                }
            }
        }
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: see `acquire`
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }
    }
}

/// Held for one read-modify-write: the in-process mutex, then the file lock
struct WriteGuard<'a> {
    _file: FileLock,
    _local: MutexGuard<'a, ()>,
}

/// Stats store backed by files in a data directory
pub struct FileStatsStore {
    state_path: PathBuf,
    lock_path: PathBuf,
    ledger: RewardLedger,
    guard: Mutex<()>,
}

impl FileStatsStore {
    /// Create or open a store in `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            state_path: dir.join(STATE_FILE),
            lock_path: dir.join(LOCK_FILE),
            ledger: RewardLedger::new(dir.join(LEDGER_FILE)),
            guard: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    /// Insert or replace a user's snapshot
    pub fn insert(&self, snapshot: UserStatsSnapshot) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut state = self.read_state()?;
        state.users.insert(snapshot.user_id.clone(), snapshot);
        self.write_state(&state)
    }

    fn lock(&self) -> Result<WriteGuard<'_>, StoreError> {
        let local = self.guard.lock().map_err(|_| StoreError::Poisoned)?;
        let file = FileLock::acquire(&self.lock_path)?;
        Ok(WriteGuard {
            _file: file,
            _local: local,
        })
    }

    fn read_state(&self) -> Result<StoreState, StoreError> {
        if !self.state_path.exists() {
            return Ok(StoreState::default());
        }
        let content = fs::read_to_string(&self.state_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_state(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.state_path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        fs::rename(&tmp, &self.state_path)?;
        Ok(())
    }

    fn update_user<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserStatsSnapshot) -> T,
    ) -> Result<T, StoreError> {
        let _guard = self.lock()?;
        let mut state = self.read_state()?;
        let snapshot = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        let out = f(snapshot);
        self.write_state(&state)?;
        Ok(out)
    }
}

impl StatsStore for FileStatsStore {
    fn load(&self, user_id: &str) -> Result<Option<UserStatsSnapshot>, StoreError> {
        // Writers replace the state file by rename, so readers never see a
        // partial file and need no lock.
        Ok(self.read_state()?.users.get(user_id).cloned())
    }

    fn apply_task_delta(
        &self,
        user_id: &str,
        delta: &TaskDelta,
    ) -> Result<TaskApplication, StoreError> {
        let _guard = self.lock()?;
        let mut state = self.read_state()?;
        let StoreState { users, tasks, .. } = &mut state;
        let snapshot = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;

        let key = task_key(user_id, &delta.completion_id);
        if tasks.contains(&key) {
            debug!("Task delta {} already applied", delta.completion_id);
            return Ok(TaskApplication {
                snapshot: snapshot.clone(),
                applied: false,
            });
        }

        snapshot.apply_task_delta(delta);
        let snapshot = snapshot.clone();
        tasks.insert(key);
        self.write_state(&state)?;
        Ok(TaskApplication {
            snapshot,
            applied: true,
        })
    }

    fn set_level(&self, user_id: &str, level: u32) -> Result<(), StoreError> {
        self.update_user(user_id, |s| s.set_level(level))
    }

    fn apply_milestone_reward(
        &self,
        user_id: &str,
        milestone_id: &str,
        reward: &MilestoneReward,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock()?;
        let mut state = self.read_state()?;
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
        self.write_state(&state)?;

        // The state file is authoritative; a failed audit append is logged only.
        if let Err(e) = self.ledger.append(&LedgerEntry::new(user_id, milestone_id, reward)) {
            warn!("Failed to append milestone ledger entry: {}", e);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::WorkCategory;
    use tempfile::tempdir;

    #[test]
    fn test_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileStatsStore::new(dir.path());
        store
            .insert(UserStatsSnapshot::new("u1").with_points(40, 2, 5))
            .unwrap();

        let reopened = FileStatsStore::new(dir.path());
        let s = reopened.load("u1").unwrap().unwrap();
        assert_eq!(s.xp_points, 40);
        assert_eq!(s.trust_score, 2);
        assert!(reopened.load("u2").unwrap().is_none());
    }

    #[test]
    fn test_apply_task_delta_persists() {
        let dir = tempdir().unwrap();
        let store = FileStatsStore::new(dir.path());
        store.insert(UserStatsSnapshot::new("u1")).unwrap();

        let delta = TaskDelta {
            completion_id: "c-1".to_string(),
            category: WorkCategory::Corporate,
            xp: 75,
            trust_score: 4,
            rwis: 12,
            rating: Some(5.0),
            level: 2,
        };
        let updated = store.apply_task_delta("u1", &delta).unwrap();
        assert!(updated.applied);
        assert_eq!(updated.snapshot.xp_points, 75);
        assert_eq!(updated.snapshot.current_level, 2);

        // Replaying the same completion against a reopened store changes nothing
        let reopened = FileStatsStore::new(dir.path());
        assert!(!reopened.apply_task_delta("u1", &delta).unwrap().applied);

        let reloaded = reopened.load("u1").unwrap().unwrap();
        assert_eq!(reloaded.tasks_in(WorkCategory::Corporate), 1);
        assert_eq!(reloaded.rwis_score, 12);
    }

    #[test]
    fn test_milestone_reward_survives_reopen() {
        let dir = tempdir().unwrap();
        let store = FileStatsStore::new(dir.path());
        store.insert(UserStatsSnapshot::new("u1")).unwrap();

        let reward = MilestoneReward::xp(25).with_badge("first_quest");
        assert!(store.apply_milestone_reward("u1", "tasks_1", &reward).unwrap());

        // A store opened later on the same directory sees the key
        let reopened = FileStatsStore::new(dir.path());
        assert!(!reopened.apply_milestone_reward("u1", "tasks_1", &reward).unwrap());
        assert_eq!(reopened.load("u1").unwrap().unwrap().xp_points, 25);

        let entries = reopened.ledger().entries_for("u1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].milestone_id, "tasks_1");
    }

    #[test]
    fn test_two_stores_share_directory() {
        let dir = tempdir().unwrap();
        FileStatsStore::new(dir.path())
            .insert(UserStatsSnapshot::new("u1"))
            .unwrap();

        let handles: Vec<_> = (0..2)
            .map(|n| {
                let path = dir.path().to_path_buf();
                std::thread::spawn(move || {
                    let store = FileStatsStore::new(path);
                    for i in 0..50 {
                        let delta = TaskDelta {
                            completion_id: format!("s{}-{}", n, i),
                            category: WorkCategory::Freelance,
                            xp: 1,
                            trust_score: 0,
                            rwis: 0,
                            rating: None,
                            level: 0,
                        };
                        store.apply_task_delta("u1", &delta).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let s = FileStatsStore::new(dir.path()).load("u1").unwrap().unwrap();
        assert_eq!(s.total_tasks(), 100);
        assert_eq!(s.xp_points, 100);
        assert!(dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_unknown_user_errors() {
        let dir = tempdir().unwrap();
        let store = FileStatsStore::new(dir.path());
        let err = store.set_level("ghost", 3).unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser(_)));
    }
}
