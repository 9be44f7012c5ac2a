use crate::domain::workflow::{ParseStatusError, Workflow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintStatus {
    Draft,
    Active,
}

impl Workflow for BlueprintStatus {
    const INITIAL: Self = BlueprintStatus::Draft;

    fn next(self) -> Option<Self> {
        match self {
            BlueprintStatus::Draft => Some(BlueprintStatus::Active),
            BlueprintStatus::Active => None,
        }
    }
}

impl fmt::Display for BlueprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlueprintStatus::Draft => write!(f, "draft"),
            BlueprintStatus::Active => write!(f, "active"),
        }
    }
}

impl FromStr for BlueprintStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(BlueprintStatus::Draft),
            "active" => Ok(BlueprintStatus::Active),
            other => Err(ParseStatusError {
                kind: "blueprint",
                input: other.to_string(),
            }),
        }
    }
}

/// Target allocation in whole percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAllocation {
    pub equities: u8,
    pub fixed_income: u8,
    pub alternatives: u8,
    pub cash: u8,
}

impl TargetAllocation {
    pub fn total(&self) -> u32 {
        u32::from(self.equities)
            + u32::from(self.fixed_income)
            + u32::from(self.alternatives)
            + u32::from(self.cash)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub status: BlueprintStatus,
    pub goals: Vec<String>,
    pub risk_tolerance: String,
    pub time_horizon: String,
    pub target_allocation: TargetAllocation,
    pub created_at: NaiveDate,
    pub updated_at: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_activates_once() {
        assert_eq!(BlueprintStatus::Draft.next(), Some(BlueprintStatus::Active));
        assert!(BlueprintStatus::Active.is_terminal());
    }

    #[test]
    fn allocation_total_sums_all_buckets() {
        let allocation = TargetAllocation {
            equities: 55,
            fixed_income: 25,
            alternatives: 15,
            cash: 5,
        };
        assert_eq!(allocation.total(), 100);
    }
}
