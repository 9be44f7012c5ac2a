use crate::domain::workflow::{ParseStatusError, Workflow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Draft,
    Approved,
    Executing,
    Confirmed,
}

impl Workflow for RecommendationStatus {
    const INITIAL: Self = RecommendationStatus::Draft;

    fn next(self) -> Option<Self> {
        match self {
            RecommendationStatus::Draft => Some(RecommendationStatus::Approved),
            RecommendationStatus::Approved => Some(RecommendationStatus::Executing),
            RecommendationStatus::Executing => Some(RecommendationStatus::Confirmed),
            RecommendationStatus::Confirmed => None,
        }
    }
}

impl RecommendationStatus {
    /// Entering this status hands the recommendation to an execution partner.
    pub fn requires_ticket(self) -> bool {
        self == RecommendationStatus::Executing
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendationStatus::Draft => "draft",
            RecommendationStatus::Approved => "approved",
            RecommendationStatus::Executing => "executing",
            RecommendationStatus::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}

impl FromStr for RecommendationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(RecommendationStatus::Draft),
            "approved" => Ok(RecommendationStatus::Approved),
            "executing" => Ok(RecommendationStatus::Executing),
            "confirmed" => Ok(RecommendationStatus::Confirmed),
            other => Err(ParseStatusError {
                kind: "recommendation",
                input: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub blueprint_id: String,
    pub client_name: String,
    pub title: String,
    pub description: String,
    pub status: RecommendationStatus,
    pub asset: String,
    pub amount: u64,
    pub rationale: String,
    pub partner: String,
    pub created_by: String,
    pub created_at: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_reaches_confirmed_in_three_steps() {
        let mut status = RecommendationStatus::INITIAL;
        let mut steps = 0;
        while let Some(next) = status.next() {
            status = next;
            steps += 1;
        }
        assert_eq!(status, RecommendationStatus::Confirmed);
        assert_eq!(steps, 3);
    }

    #[test]
    fn only_executing_requires_ticket() {
        assert!(RecommendationStatus::Executing.requires_ticket());
        assert!(!RecommendationStatus::Approved.requires_ticket());
        assert!(!RecommendationStatus::Confirmed.requires_ticket());
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!(
            "executing".parse::<RecommendationStatus>().unwrap(),
            RecommendationStatus::Executing
        );
        let err = "shipped".parse::<RecommendationStatus>().unwrap_err();
        assert_eq!(err.input, "shipped");
    }

    #[test]
    fn ordinal_follows_chain() {
        assert_eq!(RecommendationStatus::Draft.ordinal(), 0);
        assert_eq!(RecommendationStatus::Confirmed.ordinal(), 3);
    }
}
