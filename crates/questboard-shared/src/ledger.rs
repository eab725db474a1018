//! Append-only ledger of applied milestone rewards.
//!
//! One JSON object per line, fsynced on append. The ledger is the audit trail
//! for reward application; idempotency itself is enforced by the store that
//! owns the snapshot.

use crate::error::StoreError;
use crate::milestone::MilestoneReward;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Key identifying one milestone reward for one user
pub fn idempotency_key(user_id: &str, milestone_id: &str) -> String {
    format!("{}:{}", user_id, milestone_id)
}

/// Key identifying one task completion for one user
pub fn task_key(user_id: &str, completion_id: &str) -> String {
    format!("{}:task:{}", user_id, completion_id)
}

/// Single applied reward
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: String,
    pub milestone_id: String,
    pub reward: MilestoneReward,
    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(user_id: &str, milestone_id: &str, reward: &MilestoneReward) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            milestone_id: milestone_id.to_string(),
            reward: reward.clone(),
            applied_at: Utc::now(),
        }
    }

    pub fn key(&self) -> String {
        idempotency_key(&self.user_id, &self.milestone_id)
    }
}

/// JSONL reward ledger
pub struct RewardLedger {
    path: PathBuf,
}

impl RewardLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry
    pub fn append(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all entries, skipping malformed lines
    pub fn read_all(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed ledger line: {}", e),
            }
        }

        Ok(entries)
    }

    /// Entries for one user, in append order
    pub fn entries_for(&self, user_id: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }
}
