//! Progression Module
//!
//! Pure calculators for the reward and progression system.
//!
//! ## Rewards
//!
//! - XP, trust score and RWIS per completed task, each with a reasoning trail
//! - Category multipliers favour community work
//!
//! ## Levels
//!
//! - Exponential XP curve, feature unlocks and title bands
//!
//! ## Milestones
//!
//! - Threshold ladders over XP, trust, RWIS, tasks, level and per-category work
//! - Category balance scoring

pub mod balance;
pub mod levels;
pub mod milestones;
pub mod rewards;

pub use balance::{
    category_recommendations, CategoryRecommendation, CategoryRecommendations, CategoryShare,
};
pub use levels::{LevelCalculator, LevelProgress, LevelProgressionResult};
pub use milestones::{MilestoneCatalog, MilestonePartition, ProgressInputs};
pub use rewards::{RewardCalculator, RwisResult, TrustResult, XpResult};
