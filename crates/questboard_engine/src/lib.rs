//! Questboard Engine - progression and rewards for the task marketplace
//!
//! Turns completed tasks into XP, trust score and real-world impact score
//! (RWIS), tracks levels and milestones, and suggests which work category a
//! user should try next.
//!
//! The calculators in [`progression`] are pure. [`MilestoneTracker`] and
//! [`ProgressionEngine`] work against a `StatsStore` and a `BadgeCatalog`
//! from `questboard_shared`.

pub mod config;
pub mod engine;
pub mod locks;
pub mod progression;
pub mod tracker;

pub use config::{CompletionRule, ProgressionConfig};
pub use engine::{ProgressionEngine, TaskCompletionOutcome};
pub use locks::UserLocks;
pub use progression::*;
pub use tracker::{MilestoneTracker, ProgressionSummary};
