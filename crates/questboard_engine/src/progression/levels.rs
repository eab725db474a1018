//! Level System
//!
//! Exponential per-level XP curve with feature unlocks and title bands.
//!
//! ## XP Curve
//!
//! XP needed to advance from level L: floor(base * growth^(L-1))
//! - base = 100, growth = 1.5
//!
//! Cumulative XP to reach level L is the sum of the requirements of levels
//! 1..L-1. This means:
//! - Level 2: 100 XP total
//! - Level 5: 812 XP total
//! - Level 10: 7,486 XP total

use crate::config::{LevelConfig, MAX_LEVEL_CAP};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of re-evaluating a user's level after an XP change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgressionResult {
    pub previous_level: u32,
    pub new_level: u32,
    pub leveled_up: bool,
    /// Cumulative XP at which `new_level` starts
    #[serde(rename = "xpRequiredForCurrentLevel")]
    pub xp_required_for_current_level: u64,
    #[serde(rename = "xpToNextLevel")]
    pub xp_to_next_level: u64,
    /// Features available at `new_level`; empty unless a level-up happened
    pub unlocked_features: BTreeSet<String>,
    pub title: String,
}

/// Level presentation with absolute cumulative XP markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub current_level: u32,
    pub title: String,
    pub total_xp: u64,
    /// Cumulative XP at which the current level starts
    pub current_level_xp: u64,
    /// Cumulative XP at which the next level starts
    pub next_level_xp: u64,
    pub xp_into_level: u64,
    pub xp_to_next_level: u64,
    /// Percent of the current level completed (0-100)
    pub progress_percent: u8,
    pub max_level: bool,
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self {
            current_level: 1,
            title: String::new(),
            total_xp: 0,
            current_level_xp: 0,
            next_level_xp: 0,
            xp_into_level: 0,
            xp_to_next_level: 0,
            progress_percent: 0,
            max_level: false,
        }
    }
}

/// Pure level calculator
#[derive(Debug, Clone, Default)]
pub struct LevelCalculator {
    config: LevelConfig,
}

impl LevelCalculator {
    /// Calculator over `config`, normalized (sorted bands, capped levels)
    pub fn new(mut config: LevelConfig) -> Self {
        config.normalize();
        Self { config }
    }

    pub fn max_level(&self) -> u32 {
        self.config.max_level.clamp(1, MAX_LEVEL_CAP)
    }

    /// XP needed to advance from `level` to `level + 1`
    pub fn requirement(&self, level: u32) -> u64 {
        let exponent = level.max(1) - 1;
        let xp = self.config.base_requirement as f64 * self.config.growth.powi(exponent as i32);
        // `as` saturates on overflow
        xp.floor() as u64
    }

    /// Total XP needed to reach `level` from zero
    pub fn cumulative_xp(&self, level: u32) -> u64 {
        (1..level.max(1)).fold(0u64, |acc, l| acc.saturating_add(self.requirement(l)))
    }

    /// Highest level whose cumulative requirement is covered by `total_xp`
    pub fn level_for_xp(&self, total_xp: u64) -> u32 {
        let max = self.max_level();
        let mut level = 1;
        let mut cumulative = 0u64;
        while level < max {
            let next = cumulative.saturating_add(self.requirement(level));
            if next > total_xp {
                break;
            }
            cumulative = next;
            level += 1;
        }
        level
    }

    /// Title for a level
    pub fn title(&self, level: u32) -> String {
        self.config
            .titles
            .iter()
            .rev()
            .find(|band| level >= band.min_level)
            .map(|band| band.title.clone())
            .unwrap_or_default()
    }

    /// Every feature unlocked at or below `level`
    pub fn features_through(&self, level: u32) -> BTreeSet<String> {
        self.config
            .features
            .iter()
            .filter(|f| f.level <= level)
            .map(|f| f.feature.clone())
            .collect()
    }

    /// Re-evaluate the level for `total_xp` against the caller's current level
    pub fn calculate_level_progression(
        &self,
        total_xp: u64,
        current_level: u32,
    ) -> LevelProgressionResult {
        let previous_level = current_level.max(1);
        let new_level = self.level_for_xp(total_xp);
        let leveled_up = new_level > previous_level;

        let level_start = self.cumulative_xp(new_level);
        let xp_to_next_level = if new_level >= self.max_level() {
            0
        } else {
            self.requirement(new_level)
                .saturating_sub(total_xp.saturating_sub(level_start))
        };

        let unlocked_features = if leveled_up {
            self.features_through(new_level)
        } else {
            BTreeSet::new()
        };

        LevelProgressionResult {
            previous_level,
            new_level,
            leveled_up,
            xp_required_for_current_level: level_start,
            xp_to_next_level,
            unlocked_features,
            title: self.title(new_level),
        }
    }

    /// Level view for a user's XP total
    pub fn level_progress(&self, total_xp: u64) -> LevelProgress {
        let level = self.level_for_xp(total_xp);
        let current_level_xp = self.cumulative_xp(level);
        let at_max = level >= self.max_level();

        let (next_level_xp, xp_to_next_level, progress_percent) = if at_max {
            (current_level_xp, 0, 100)
        } else {
            let next = current_level_xp.saturating_add(self.requirement(level));
            let span = next - current_level_xp;
            let into = total_xp.saturating_sub(current_level_xp);
            let pct = if span == 0 {
                100
            } else {
                ((into as u128 * 100) / span as u128).min(100) as u8
            };
            (next, next.saturating_sub(total_xp), pct)
        };

        LevelProgress {
            current_level: level,
            title: self.title(level),
            total_xp,
            current_level_xp,
            next_level_xp,
            xp_into_level: total_xp.saturating_sub(current_level_xp),
            xp_to_next_level,
            progress_percent,
            max_level: at_max,
        }
    }
}
