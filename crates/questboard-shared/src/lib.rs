//! Shared types and collaborator seams for the Questboard progression engine.
//!
//! Data model (categories, task rewards, statistics snapshots, milestones),
//! the `StatsStore` and `BadgeCatalog` traits, and the stores that implement
//! them.

pub mod badges;
pub mod category;
pub mod error;
pub mod ledger;
pub mod milestone;
pub mod stats;
pub mod stats_store;
pub mod store;
pub mod task;

pub use badges::{BadgeCatalog, BadgeCriterion, BadgeDefinition, EarnedBadge, StaticBadgeCatalog};
pub use category::{TaskComplexity, WorkCategory};
pub use error::StoreError;
pub use ledger::{idempotency_key, task_key, LedgerEntry, RewardLedger};
pub use milestone::{Milestone, MilestoneCategory, MilestoneReward};
pub use stats::{CategoryMetrics, TaskDelta, UserStatsSnapshot, WorkTotals};
pub use stats_store::FileStatsStore;
pub use store::{MemoryStatsStore, StatsStore, TaskApplication};
pub use task::{QualityScore, TaskCompletion, TaskRewardSpec};
