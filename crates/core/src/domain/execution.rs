use crate::domain::recommendation::Recommendation;
use crate::domain::workflow::{ParseStatusError, Workflow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Created,
    Submitted,
    Processing,
    Confirmed,
}

impl Workflow for ExecutionStatus {
    const INITIAL: Self = ExecutionStatus::Created;

    fn next(self) -> Option<Self> {
        match self {
            ExecutionStatus::Created => Some(ExecutionStatus::Submitted),
            ExecutionStatus::Submitted => Some(ExecutionStatus::Processing),
            ExecutionStatus::Processing => Some(ExecutionStatus::Confirmed),
            ExecutionStatus::Confirmed => None,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Created => "created",
            ExecutionStatus::Submitted => "submitted",
            ExecutionStatus::Processing => "processing",
            ExecutionStatus::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}

impl FromStr for ExecutionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "created" => Ok(ExecutionStatus::Created),
            "submitted" => Ok(ExecutionStatus::Submitted),
            "processing" => Ok(ExecutionStatus::Processing),
            "confirmed" => Ok(ExecutionStatus::Confirmed),
            other => Err(ParseStatusError {
                kind: "execution",
                input: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTicket {
    pub id: String,
    pub recommendation_id: String,
    pub client_name: String,
    pub asset: String,
    pub amount: u64,
    pub status: ExecutionStatus,
    pub partner: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl ExecutionTicket {
    /// Builds the hand-off record for `recommendation`. Business fields are copied
    /// verbatim; the ticket always starts at `created`.
    pub fn from_recommendation(
        id: String,
        recommendation: &Recommendation,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            recommendation_id: recommendation.id.clone(),
            client_name: recommendation.client_name.clone(),
            asset: recommendation.asset.clone(),
            amount: recommendation.amount,
            status: ExecutionStatus::INITIAL,
            partner: recommendation.partner.clone(),
            created_at,
            confirmed_at: None,
        }
    }
}
