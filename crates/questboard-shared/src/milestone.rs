//! Milestone types.
//!
//! Milestones are recomputed from statistics on every request; only the
//! side effects of completing one (granted points, badges, zones) are stored.

use crate::category::WorkCategory;
use serde::{Deserialize, Serialize};

/// Statistic a milestone ladder measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneCategory {
    Xp,
    TrustScore,
    Rwis,
    Tasks,
    Level,
    Category,
}

impl MilestoneCategory {
    pub const ALL: [MilestoneCategory; 6] = [
        MilestoneCategory::Xp,
        MilestoneCategory::TrustScore,
        MilestoneCategory::Rwis,
        MilestoneCategory::Tasks,
        MilestoneCategory::Level,
        MilestoneCategory::Category,
    ];

    /// Prefix used in milestone ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Xp => "xp",
            Self::TrustScore => "trust",
            Self::Rwis => "rwis",
            Self::Tasks => "tasks",
            Self::Level => "level",
            Self::Category => "category",
        }
    }
}

/// One-time reward granted when a milestone completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneReward {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_unlock: Option<String>,
}

impl MilestoneReward {
    pub fn xp(amount: u32) -> Self {
        Self {
            xp: Some(amount),
            ..Default::default()
        }
    }

    pub fn trust(amount: u32) -> Self {
        Self {
            trust_score: Some(amount),
            ..Default::default()
        }
    }

    pub fn with_badge(mut self, badge: &str) -> Self {
        self.badge = Some(badge.to_string());
        self
    }

    pub fn with_zone(mut self, zone: &str) -> Self {
        self.zone_unlock = Some(zone.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.xp.is_none()
            && self.trust_score.is_none()
            && self.badge.is_none()
            && self.zone_unlock.is_none()
    }
}

/// A progress threshold over one statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: MilestoneCategory,
    /// Set for `MilestoneCategory::Category` milestones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_category: Option<WorkCategory>,
    pub current_value: u64,
    pub target_value: u64,
    /// Percent complete, 0-100
    pub progress: u8,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<MilestoneReward>,
}

impl Milestone {
    /// Progress percentage, floored and capped at 100
    pub fn progress_for(current: u64, target: u64) -> u8 {
        if target == 0 {
            return 100;
        }
        let pct = (current as u128 * 100) / target as u128;
        pct.min(100) as u8
    }

    /// Reached the target exactly (the default "newly completed" trigger)
    pub fn is_exact_hit(&self) -> bool {
        self.completed && self.current_value == self.target_value
    }
}
