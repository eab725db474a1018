//! Task reward definitions and completion signals.

use crate::category::{TaskComplexity, WorkCategory};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rewards attached to a task by its author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRewardSpec {
    pub xp: u32,
    pub trust_score_bonus: u32,
    pub rwis_points: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<f64>,
}

impl TaskRewardSpec {
    pub fn new(xp: u32, trust_score_bonus: u32, rwis_points: u32) -> Self {
        Self {
            xp,
            trust_score_bonus,
            rwis_points,
            badges: Vec::new(),
            payment: None,
        }
    }

    pub fn with_badge(mut self, badge: &str) -> Self {
        self.badges.push(badge.to_string());
        self
    }

    /// Attach a payment; non-positive or non-finite amounts are dropped
    pub fn with_payment(mut self, amount: f64) -> Self {
        self.payment = if amount.is_finite() && amount > 0.0 {
            Some(amount)
        } else {
            None
        };
        self
    }
}

/// Quality rating clamped to [0, 5]. Scores that round to tier 0 (below 0.5)
/// mean "no rating" everywhere: no XP bonus, no trust change, no average.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct QualityScore(f64);

impl QualityScore {
    pub const MAX: f64 = 5.0;

    /// Create a score, clamping to [0, 5]; NaN becomes 0
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, Self::MAX))
    }

    pub fn unrated() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_rated(&self) -> bool {
        self.tier() >= 1
    }

    /// Whole-star tier 0..=5 (rounded)
    pub fn tier(&self) -> u8 {
        self.0.round() as u8
    }
}

impl Default for QualityScore {
    fn default() -> Self {
        Self::unrated()
    }
}

impl From<f64> for QualityScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<QualityScore> for f64 {
    fn from(score: QualityScore) -> Self {
        score.0
    }
}

/// Everything known about one finished task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    /// Identifies this completion; a store applies each id at most once
    #[serde(default = "new_completion_id")]
    pub completion_id: String,
    pub rewards: TaskRewardSpec,
    pub category: WorkCategory,
    #[serde(default)]
    pub quality: QualityScore,
    /// Actual duration over estimated duration: <1.0 early, >1.0 late
    #[serde(default = "default_time_ratio")]
    pub completion_time_ratio: f64,
    #[serde(default = "default_on_time")]
    pub on_time: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_feedback: Option<QualityScore>,
    #[serde(default)]
    pub complexity: TaskComplexity,
}

fn new_completion_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_time_ratio() -> f64 {
    1.0
}

fn default_on_time() -> bool {
    true
}

impl TaskCompletion {
    /// On-time, unrated, low-complexity completion
    pub fn new(rewards: TaskRewardSpec, category: WorkCategory) -> Self {
        Self {
            completion_id: new_completion_id(),
            rewards,
            category,
            quality: QualityScore::unrated(),
            completion_time_ratio: 1.0,
            on_time: true,
            client_feedback: None,
            complexity: TaskComplexity::Low,
        }
    }

    /// Use a caller-supplied id, e.g. the marketplace's task assignment id
    pub fn with_completion_id(mut self, id: &str) -> Self {
        self.completion_id = id.to_string();
        self
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = QualityScore::new(quality);
        self
    }

    /// Set the time ratio; `on_time` follows it (ratio <= 1.0)
    pub fn with_time_ratio(mut self, ratio: f64) -> Self {
        self.completion_time_ratio = ratio;
        self.on_time = ratio.is_nan() || ratio <= 1.0;
        self
    }

    pub fn with_client_feedback(mut self, rating: f64) -> Self {
        self.client_feedback = Some(QualityScore::new(rating));
        self
    }

    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = complexity;
        self
    }
}
