//! Work categories and task complexity.
//!
//! Both enums are lenient on input: unknown strings map to a fixed default
//! instead of failing, so a stale client or a renamed category can never
//! break reward calculation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum WorkCategory {
    Freelance,
    Community,
    Corporate,
}

impl WorkCategory {
    /// Every category, in declaration order
    pub const ALL: [WorkCategory; 3] = [
        WorkCategory::Freelance,
        WorkCategory::Community,
        WorkCategory::Corporate,
    ];

    /// Parse a category name, falling back to `Community` when unrecognized
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "FREELANCE" => Self::Freelance,
            "COMMUNITY" => Self::Community,
            "CORPORATE" => Self::Corporate,
            _ => Self::default(),
        }
    }

    /// Lowercase identifier used in milestone and badge ids
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Freelance => "freelance",
            Self::Community => "community",
            Self::Corporate => "corporate",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Freelance => "Freelance",
            Self::Community => "Community",
            Self::Corporate => "Corporate",
        }
    }
}

impl Default for WorkCategory {
    fn default() -> Self {
        Self::Community
    }
}

impl From<String> for WorkCategory {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for WorkCategory {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for WorkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Task complexity as declared by the task author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum TaskComplexity {
    Low,
    Medium,
    High,
}

impl TaskComplexity {
    /// Parse a complexity name, falling back to `Low` when unrecognized
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl Default for TaskComplexity {
    fn default() -> Self {
        Self::Low
    }
}

impl From<String> for TaskComplexity {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_categories() {
        assert_eq!(WorkCategory::parse("FREELANCE"), WorkCategory::Freelance);
        assert_eq!(WorkCategory::parse("corporate"), WorkCategory::Corporate);
        assert_eq!(WorkCategory::parse(" Community "), WorkCategory::Community);
    }

    #[test]
    fn test_unknown_category_falls_back_to_community() {
        assert_eq!(WorkCategory::parse("VOLUNTEER"), WorkCategory::Community);
        assert_eq!(WorkCategory::parse(""), WorkCategory::Community);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&WorkCategory::Freelance).unwrap();
        assert_eq!(json, "\"FREELANCE\"");

        let parsed: WorkCategory = serde_json::from_str("\"CORPORATE\"").unwrap();
        assert_eq!(parsed, WorkCategory::Corporate);

        let unknown: WorkCategory = serde_json::from_str("\"GOVERNMENT\"").unwrap();
        assert_eq!(unknown, WorkCategory::Community);
    }

    #[test]
    fn test_complexity_fallback() {
        assert_eq!(TaskComplexity::parse("HIGH"), TaskComplexity::High);
        assert_eq!(TaskComplexity::parse("medium"), TaskComplexity::Medium);
        assert_eq!(TaskComplexity::parse("EXTREME"), TaskComplexity::Low);

        let parsed: TaskComplexity = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(parsed, TaskComplexity::Low);
    }
}
