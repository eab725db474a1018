//! Reward Calculator
//!
//! Turns one completed task into XP, trust score and RWIS awards. Each
//! calculation is a pure function of its arguments and returns the awarded
//! total together with an ordered reasoning trail for audit and display.
//!
//! ## XP
//!
//! total = (base * category_multiplier + quality_bonus + early_bonus) * level_factor
//!
//! - quality_bonus = base * quality_xp_step * quality (0-5), zero when unrated
//!   (quality below 0.5)
//! - early_bonus   = base * early_completion_rate when the time ratio is < 1.0
//! - level_factor  = max(min_factor, 1 / (1 + step * (level - 1)))
//!
//! ## Trust
//!
//! total = max(0, base + quality_tier_delta - late_penalty + community_bonus
//!                + feedback_delta)
//!
//! ## RWIS
//!
//! total = base * impact_multiplier + complexity_bonus + quality_impact_bonus

use crate::config::RewardConfig;
use questboard_shared::{QualityScore, TaskComplexity, TaskRewardSpec, WorkCategory};
use serde::{Deserialize, Serialize};

/// XP awarded for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpResult {
    #[serde(rename = "baseXP")]
    pub base_xp: u32,
    /// total - base; negative when level scaling outweighs the bonuses
    #[serde(rename = "bonusXP")]
    pub bonus_xp: i64,
    #[serde(rename = "totalXP")]
    pub total_xp: u32,
    pub reasoning: Vec<String>,
}

/// Trust score awarded for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustResult {
    pub base_trust_score: u32,
    pub bonus_trust_score: i64,
    pub total_trust_score: u32,
    pub reasoning: Vec<String>,
}

/// Real-world impact score awarded for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RwisResult {
    #[serde(rename = "baseRWIS")]
    pub base_rwis: u32,
    #[serde(rename = "bonusRWIS")]
    pub bonus_rwis: i64,
    #[serde(rename = "totalRWIS")]
    pub total_rwis: u32,
    pub reasoning: Vec<String>,
}

/// Pure reward calculator
#[derive(Debug, Clone, Default)]
pub struct RewardCalculator {
    config: RewardConfig,
}

impl RewardCalculator {
    pub fn new(mut config: RewardConfig) -> Self {
        config.normalize();
        Self { config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// XP for a completed task
    pub fn calculate_xp(
        &self,
        rewards: &TaskRewardSpec,
        category: WorkCategory,
        quality: QualityScore,
        completion_time_ratio: f64,
        user_level: u32,
    ) -> XpResult {
        let mut reasoning = vec![format!("Base XP from task: {}", rewards.xp)];
        let base = rewards.xp as f64;

        let multiplier = self.config.xp_multipliers.for_category(category);
        let category_xp = base * multiplier;
        reasoning.push(format!(
            "{} work multiplier: x{:.1} ({} XP)",
            category.label(),
            multiplier,
            category_xp.round()
        ));

        let quality_bonus = if quality.is_rated() {
            let bonus = base * self.config.quality_xp_step * quality.value();
            reasoning.push(format!(
                "Quality bonus ({:.1}/5): +{} XP",
                quality.value(),
                bonus.round()
            ));
            bonus
        } else {
            reasoning.push("No quality rating: +0 XP".to_string());
            0.0
        };

        let ratio = normalize_time_ratio(completion_time_ratio);
        let early_bonus = if ratio < 1.0 {
            let bonus = base * self.config.early_completion_rate;
            reasoning.push(format!("Early completion bonus: +{} XP", bonus.round()));
            bonus
        } else {
            0.0
        };

        let level = user_level.max(1);
        let factor = self.level_factor(level);
        if factor < 1.0 {
            reasoning.push(format!("Level {} scaling: x{:.2}", level, factor));
        }

        let total = to_points((category_xp + quality_bonus + early_bonus) * factor);
        reasoning.push(format!("Total XP: {}", total));

        XpResult {
            base_xp: rewards.xp,
            bonus_xp: total as i64 - rewards.xp as i64,
            total_xp: total,
            reasoning,
        }
    }

    /// Trust score for a completed task
    pub fn calculate_trust_score(
        &self,
        rewards: &TaskRewardSpec,
        category: WorkCategory,
        quality: QualityScore,
        on_time: bool,
        client_feedback: Option<QualityScore>,
    ) -> TrustResult {
        let base = rewards.trust_score_bonus as i64;
        let mut reasoning = vec![format!("Base trust score from task: {}", base)];
        let mut adjustment: i64 = 0;

        let tier = quality.tier().min(5);
        if !quality.is_rated() {
            reasoning.push("No quality rating: +0 trust score".to_string());
        } else {
            let delta = self.config.quality_trust_tiers[tier as usize] as i64;
            adjustment += delta;
            reasoning.push(format!("Quality rating {}/5: {:+} trust score", tier, delta));
        }

        if !on_time {
            let penalty = self.config.late_penalty as i64;
            adjustment -= penalty;
            reasoning.push(format!("Late completion: -{} trust score", penalty));
        }

        if category == WorkCategory::Community {
            let bonus = self.config.community_trust_bonus as i64;
            adjustment += bonus;
            reasoning.push(format!("Community work bonus: +{} trust score", bonus));
        }

        if let Some(feedback) = client_feedback.filter(|f| f.is_rated()) {
            let delta = self.config.feedback_trust_delta as i64;
            if feedback.value() >= 4.0 {
                adjustment += delta;
                reasoning.push(format!("Positive client feedback: +{} trust score", delta));
            } else if feedback.value() <= 2.0 {
                adjustment -= delta;
                reasoning.push(format!("Negative client feedback: -{} trust score", delta));
            }
        }

        let raw = base + adjustment;
        if raw < 0 {
            reasoning.push("Trust score cannot drop below 0".to_string());
        }
        let total = raw.clamp(0, u32::MAX as i64) as u32;
        reasoning.push(format!("Total trust score: {}", total));

        TrustResult {
            base_trust_score: rewards.trust_score_bonus,
            bonus_trust_score: total as i64 - base,
            total_trust_score: total,
            reasoning,
        }
    }

    /// Real-world impact score for a completed task
    pub fn calculate_rwis(
        &self,
        rewards: &TaskRewardSpec,
        category: WorkCategory,
        quality: QualityScore,
        complexity: TaskComplexity,
    ) -> RwisResult {
        let mut reasoning = vec![format!("Base RWIS from task: {}", rewards.rwis_points)];
        let base = rewards.rwis_points as f64;

        let multiplier = self.config.rwis_multipliers.for_category(category);
        let impact = base * multiplier;
        reasoning.push(format!(
            "{} impact multiplier: x{:.1} ({} RWIS)",
            category.label(),
            multiplier,
            impact.round()
        ));

        let complexity_bonus = self.config.complexity_bonus.for_complexity(complexity) as f64;
        reasoning.push(format!(
            "{} complexity bonus: +{} RWIS",
            complexity.label(),
            complexity_bonus
        ));

        let quality_bonus = if quality.tier() >= 5 {
            let bonus = (base * self.config.quality_impact_rate).round().max(1.0);
            reasoning.push(format!("High quality impact bonus: +{} RWIS", bonus));
            bonus
        } else {
            0.0
        };

        let total = to_points(impact + complexity_bonus + quality_bonus);
        reasoning.push(format!("Total RWIS: {}", total));

        RwisResult {
            base_rwis: rewards.rwis_points,
            bonus_rwis: total as i64 - rewards.rwis_points as i64,
            total_rwis: total,
            reasoning,
        }
    }

    /// Anti-inflation factor: 1.0 at level 1, non-increasing with level
    pub fn level_factor(&self, level: u32) -> f64 {
        let steps = level.max(1) as f64 - 1.0;
        let factor = 1.0 / (1.0 + self.config.level_scaling_step * steps);
        factor.max(self.config.min_level_factor).min(1.0)
    }
}

/// Negative and NaN ratios are treated as on time
fn normalize_time_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() || ratio < 0.0 {
        1.0
    } else {
        ratio
    }
}

/// Round and clamp a point value into u32
fn to_points(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round().min(u32::MAX as f64) as u32
}
