//! Progression Configuration
//!
//! Every multiplier, threshold table and milestone ladder the engine uses.
//! The engine receives a `ProgressionConfig` at construction; nothing is read
//! from global state.
//!
//! Config file: `/etc/questboard/progression.toml`, overridden by the
//! `QUESTBOARD_CONFIG` environment variable. Every field has a default, so a
//! partial file (or no file at all) is valid.

use anyhow::{ensure, Context, Result};
use questboard_shared::{MilestoneReward, TaskComplexity, WorkCategory};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable that overrides the config path
pub const CONFIG_ENV: &str = "QUESTBOARD_CONFIG";

/// Default config path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/questboard/progression.toml";

/// Highest level a curve may define
pub const MAX_LEVEL_CAP: u32 = 1_000;

/// Longest "recent badges" window, in days
pub const MAX_RECENT_BADGE_DAYS: i64 = 3_650;

/// One weight per work category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub freelance: f64,
    pub community: f64,
    pub corporate: f64,
}

impl CategoryWeights {
    pub fn for_category(&self, category: WorkCategory) -> f64 {
        match category {
            WorkCategory::Freelance => self.freelance,
            WorkCategory::Community => self.community,
            WorkCategory::Corporate => self.corporate,
        }
    }

    /// Finite, non-negative, and community > corporate > freelance
    fn check_ordering(&self, name: &str) -> Result<()> {
        ensure!(
            [self.freelance, self.corporate, self.community]
                .iter()
                .all(|w| w.is_finite() && *w >= 0.0),
            "{} multipliers must be finite and non-negative",
            name
        );
        ensure!(
            self.community > self.corporate && self.corporate > self.freelance,
            "{} multipliers must rank community > corporate > freelance (got {} / {} / {})",
            name,
            self.community,
            self.corporate,
            self.freelance
        );
        Ok(())
    }
}

/// Flat bonus per task complexity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityBonus {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl ComplexityBonus {
    pub fn for_complexity(&self, complexity: TaskComplexity) -> u32 {
        match complexity {
            TaskComplexity::Low => self.low,
            TaskComplexity::Medium => self.medium,
            TaskComplexity::High => self.high,
        }
    }
}

/// Reward calculation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// XP multiplier per category (community highest, freelance baseline)
    pub xp_multipliers: CategoryWeights,
    /// XP bonus per quality point, as a fraction of base XP
    pub quality_xp_step: f64,
    /// Early completion bonus, as a fraction of base XP
    pub early_completion_rate: f64,
    /// Level scaling: factor = 1 / (1 + step * (level - 1))
    pub level_scaling_step: f64,
    /// Lower bound for the level scaling factor
    pub min_level_factor: f64,
    /// Trust delta per quality tier, indexed 0..=5
    pub quality_trust_tiers: [i32; 6],
    pub late_penalty: u32,
    pub community_trust_bonus: u32,
    /// Trust delta for very good (>= 4) or poor (<= 2) client feedback
    pub feedback_trust_delta: u32,
    /// RWIS multiplier per category
    pub rwis_multipliers: CategoryWeights,
    pub complexity_bonus: ComplexityBonus,
    /// Top-tier quality impact bonus, as a fraction of base RWIS (minimum 1)
    pub quality_impact_rate: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            xp_multipliers: CategoryWeights {
                freelance: 1.0,
                community: 1.5,
                corporate: 1.2,
            },
            quality_xp_step: 0.1,
            early_completion_rate: 0.2,
            level_scaling_step: 0.05,
            min_level_factor: 0.25,
            quality_trust_tiers: [0, -1, 0, 1, 2, 3],
            late_penalty: 3,
            community_trust_bonus: 1,
            feedback_trust_delta: 1,
            rwis_multipliers: CategoryWeights {
                freelance: 1.0,
                community: 2.0,
                corporate: 1.3,
            },
            complexity_bonus: ComplexityBonus {
                low: 0,
                medium: 5,
                high: 10,
            },
            quality_impact_rate: 0.2,
        }
    }
}

impl RewardConfig {
    /// Clamp rates into their valid ranges
    pub fn normalize(&mut self) {
        self.level_scaling_step = non_negative(self.level_scaling_step);
        self.min_level_factor = non_negative(self.min_level_factor).min(1.0);
        self.quality_xp_step = non_negative(self.quality_xp_step);
        self.early_completion_rate = non_negative(self.early_completion_rate);
        self.quality_impact_rate = non_negative(self.quality_impact_rate);
    }

    pub fn validate(&mut self) -> Result<()> {
        self.normalize();
        self.xp_multipliers.check_ordering("XP")?;
        self.rwis_multipliers.check_ordering("RWIS")?;
        Ok(())
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

/// Feature unlocked at a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureUnlock {
    pub level: u32,
    pub feature: String,
}

/// Title for a band of levels starting at `min_level`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleBand {
    pub min_level: u32,
    pub title: String,
}

/// Level curve parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// XP needed to advance from level 1
    pub base_requirement: u64,
    /// Per-level growth of the requirement
    pub growth: f64,
    pub max_level: u32,
    pub features: Vec<FeatureUnlock>,
    pub titles: Vec<TitleBand>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        let features = [
            (3, "Custom Profile Banner"),
            (5, "Advanced Task Filtering"),
            (10, "Mentor Status"),
            (15, "Community Event Hosting"),
            (20, "Corporate Partnership Access"),
            (25, "Guild Leadership"),
            (30, "Legendary Zones"),
        ];
        let titles = [
            (1, "Newcomer"),
            (5, "Apprentice"),
            (10, "Journeyman"),
            (15, "Expert"),
            (20, "Master"),
            (30, "Grandmaster"),
            (45, "Legend"),
        ];
        Self {
            base_requirement: 100,
            growth: 1.5,
            max_level: 60,
            features: features
                .iter()
                .map(|(level, feature)| FeatureUnlock {
                    level: *level,
                    feature: feature.to_string(),
                })
                .collect(),
            titles: titles
                .iter()
                .map(|(min_level, title)| TitleBand {
                    min_level: *min_level,
                    title: title.to_string(),
                })
                .collect(),
        }
    }
}

impl LevelConfig {
    /// Cap the level range and sort features and titles by level
    pub fn normalize(&mut self) {
        self.max_level = self.max_level.clamp(1, MAX_LEVEL_CAP);
        self.base_requirement = self.base_requirement.max(1);
        self.features.sort_by_key(|f| f.level);
        self.titles.sort_by_key(|t| t.min_level);
    }

    /// Normalize, then require a curve whose per-level requirement more than
    /// doubles every five levels (growth^5 > 2)
    pub fn validate(&mut self) -> Result<()> {
        self.normalize();
        ensure!(
            self.growth.is_finite() && self.growth.powi(5) > 2.0,
            "levels.growth must be above 2^(1/5) (about 1.149), got {}",
            self.growth
        );
        Ok(())
    }
}

/// Which milestones count as newly completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionRule {
    /// Completed and the current value equals the target exactly
    Exact,
    /// Completed now and not completed in the previous statistics
    Crossed,
}

impl Default for CompletionRule {
    fn default() -> Self {
        Self::Exact
    }
}

/// One rung of a milestone ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderStep {
    pub target: u64,
    #[serde(default)]
    pub reward: MilestoneReward,
}

fn step(target: u64, reward: MilestoneReward) -> LadderStep {
    LadderStep { target, reward }
}

/// Milestone ladders and summary limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneConfig {
    pub completion_rule: CompletionRule,
    pub xp: Vec<LadderStep>,
    pub trust_score: Vec<LadderStep>,
    pub rwis: Vec<LadderStep>,
    pub tasks: Vec<LadderStep>,
    pub level: Vec<LadderStep>,
    /// Applied once per work category; `{category}` in badge and zone names
    /// is replaced with the category slug
    pub category: Vec<LadderStep>,
    pub completed_limit: usize,
    pub upcoming_limit: usize,
    pub badge_suggestions: usize,
    pub recent_badge_days: i64,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        use MilestoneReward as R;
        Self {
            completion_rule: CompletionRule::Exact,
            xp: vec![
                step(100, R::trust(1)),
                step(500, R::trust(2)),
                step(1_000, R::trust(3).with_badge("xp_1k")),
                step(2_500, R::trust(5)),
                step(5_000, R::trust(5).with_badge("xp_5k")),
                step(10_000, R::trust(10).with_zone("Crystal Archives")),
                step(25_000, R::trust(10)),
                step(50_000, R::trust(15).with_badge("xp_legend")),
            ],
            trust_score: vec![
                step(10, R::xp(50)),
                step(25, R::xp(100)),
                step(50, R::xp(200).with_badge("trusted_member")),
                step(75, R::xp(300)),
                step(100, R::xp(500).with_badge("pillar_of_trust")),
                step(150, R::xp(750)),
                step(200, R::xp(1_000).with_zone("Council Chambers")),
            ],
            rwis: vec![
                step(50, R::xp(50)),
                step(100, R::xp(100)),
                step(250, R::xp(250).with_badge("impact_maker")),
                step(500, R::xp(500)),
                step(
                    1_000,
                    R::xp(1_000)
                        .with_badge("world_changer")
                        .with_zone("Harmony Gardens"),
                ),
                step(2_500, R::xp(2_000)),
            ],
            tasks: vec![
                step(1, R::xp(25).with_badge("first_quest")),
                step(5, R::xp(50)),
                step(10, R::xp(100).with_badge("task_runner")),
                step(25, R::xp(250)),
                step(50, R::xp(500).with_badge("quest_veteran")),
                step(100, R::xp(1_000).with_zone("Hall of Heroes")),
                step(250, R::xp(2_500)),
            ],
            level: vec![
                step(5, R::trust(2).with_zone("Market District")),
                step(
                    10,
                    R::trust(5)
                        .with_badge("seasoned_adventurer")
                        .with_zone("Mentor Tower"),
                ),
                step(15, R::trust(5)),
                step(20, R::trust(10).with_zone("Corporate Plaza")),
                step(25, R::trust(10)),
                step(30, R::trust(15).with_badge("legendary_hero")),
            ],
            category: vec![
                step(5, R::xp(50)),
                step(10, R::xp(100).with_badge("{category}_specialist")),
                step(25, R::xp(250)),
                step(50, R::xp(500).with_badge("{category}_expert")),
                step(100, R::xp(1_000).with_badge("{category}_master")),
            ],
            completed_limit: 10,
            upcoming_limit: 5,
            badge_suggestions: 3,
            recent_badge_days: 7,
        }
    }
}

impl MilestoneConfig {
    /// Sort every ladder by target and bound the badge window
    pub fn normalize(&mut self) {
        self.recent_badge_days = self.recent_badge_days.clamp(0, MAX_RECENT_BADGE_DAYS);
        for ladder in [
            &mut self.xp,
            &mut self.trust_score,
            &mut self.rwis,
            &mut self.tasks,
            &mut self.level,
            &mut self.category,
        ] {
            ladder.sort_by_key(|s| s.target);
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub levels: LevelConfig,
    #[serde(default)]
    pub milestones: MilestoneConfig,
}

impl ProgressionConfig {
    /// Config path: `QUESTBOARD_CONFIG` if set, otherwise the default path
    pub fn config_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load from the configured path, falling back to defaults if missing
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::config_path())
    }

    /// Load from file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No progression config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded progression config from {}", path.display());
        Ok(config)
    }

    /// Parse from a TOML string and validate
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).context("Invalid progression config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Clamp repairable values and reject settings that would break the
    /// calculators' invariants (flat level curve, inverted category order)
    pub fn validate(&mut self) -> Result<()> {
        self.rewards.validate().context("Invalid [rewards] section")?;
        self.levels.validate().context("Invalid [levels] section")?;
        self.milestones.normalize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_category_ordering() {
        let r = RewardConfig::default();
        assert!(r.xp_multipliers.community > r.xp_multipliers.corporate);
        assert!(r.xp_multipliers.corporate > r.xp_multipliers.freelance);
        assert_eq!(r.xp_multipliers.freelance, 1.0);
        assert!(r.rwis_multipliers.community > r.rwis_multipliers.corporate);
        assert!(r.rwis_multipliers.corporate > r.rwis_multipliers.freelance);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = ProgressionConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, ProgressionConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = ProgressionConfig::from_toml(
            r#"
            [rewards]
            late_penalty = 5

            [milestones]
            completion_rule = "crossed"
            tasks = [{ target = 3 }, { target = 1, reward = { xp = 10 } }]
            "#,
        )
        .unwrap();

        assert_eq!(config.rewards.late_penalty, 5);
        assert_eq!(config.rewards.community_trust_bonus, 1);
        assert_eq!(config.milestones.completion_rule, CompletionRule::Crossed);
        // Ladders are sorted by target
        assert_eq!(config.milestones.tasks[0].target, 1);
        assert_eq!(config.milestones.tasks[0].reward.xp, Some(10));
        assert!(config.milestones.tasks[1].reward.is_empty());
        assert_eq!(config.levels, LevelConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(ProgressionConfig::from_toml("rewards = 7").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("progression.toml");

        let mut config = ProgressionConfig::default();
        config.levels.max_level = 40;
        config.save(&path).unwrap();

        let loaded = ProgressionConfig::load(&path).unwrap();
        assert_eq!(loaded.levels.max_level, 40);
        assert_eq!(loaded.milestones, MilestoneConfig::default());
    }

    #[test]
    fn test_validate_clamps() {
        let config = ProgressionConfig::from_toml(
            r#"
            [rewards]
            level_scaling_step = -1.0
            min_level_factor = 3.0

            [levels]
            max_level = 0

            [milestones]
            recent_badge_days = 9223372036854775807
            "#,
        )
        .unwrap();
        assert_eq!(config.rewards.level_scaling_step, 0.0);
        assert_eq!(config.rewards.min_level_factor, 1.0);
        assert_eq!(config.levels.max_level, 1);
        assert_eq!(config.milestones.recent_badge_days, MAX_RECENT_BADGE_DAYS);
    }

    #[test]
    fn test_flat_curve_rejected() {
        for growth in ["1.0", "0.5", "1.1", "nan"] {
            let toml = format!("[levels]\ngrowth = {}\n", growth);
            let err = ProgressionConfig::from_toml(&toml).unwrap_err();
            assert!(format!("{:#}", err).contains("growth"), "growth {}", growth);
        }
        assert!(ProgressionConfig::from_toml("[levels]\ngrowth = 1.15\n").is_ok());
    }

    #[test]
    fn test_inverted_multipliers_rejected() {
        let err = ProgressionConfig::from_toml(
            r#"
            [rewards.xp_multipliers]
            freelance = 2.0
            community = 1.0
            corporate = 1.5
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("XP multipliers"));

        let mut config = ProgressionConfig::default();
        config.rewards.rwis_multipliers.corporate = config.rewards.rwis_multipliers.community;
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("RWIS multipliers"));
    }

    #[test]
    fn test_validate_caps_and_sorts() {
        let mut config = ProgressionConfig::default();
        config.levels.max_level = u32::MAX;
        config.levels.titles.reverse();
        config.milestones.tasks.reverse();
        config.milestones.recent_badge_days = -4;
        config.validate().unwrap();

        assert_eq!(config.levels.max_level, MAX_LEVEL_CAP);
        assert_eq!(config.levels.titles[0].min_level, 1);
        assert_eq!(config.milestones.tasks[0].target, 1);
        assert_eq!(config.milestones.recent_badge_days, 0);
        assert!(ProgressionConfig::default().validate().is_ok());
    }
}
