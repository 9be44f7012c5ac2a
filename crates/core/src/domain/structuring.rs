use crate::domain::workflow::{ParseStatusError, Workflow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical structuring status. Serialized as `not_started` / `in_progress`;
/// the hyphenated spellings used by the case-detail screens are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuringStatus {
    #[serde(alias = "not-started")]
    NotStarted,
    #[serde(alias = "in-progress")]
    InProgress,
    Completed,
}

impl Workflow for StructuringStatus {
    const INITIAL: Self = StructuringStatus::NotStarted;

    fn next(self) -> Option<Self> {
        match self {
            StructuringStatus::NotStarted => Some(StructuringStatus::InProgress),
            StructuringStatus::InProgress => Some(StructuringStatus::Completed),
            StructuringStatus::Completed => None,
        }
    }
}

impl fmt::Display for StructuringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructuringStatus::NotStarted => "not_started",
            StructuringStatus::InProgress => "in_progress",
            StructuringStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for StructuringStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not_started" | "not-started" => Ok(StructuringStatus::NotStarted),
            "in_progress" | "in-progress" => Ok(StructuringStatus::InProgress),
            "completed" => Ok(StructuringStatus::Completed),
            other => Err(ParseStatusError {
                kind: "structuring",
                input: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Standard,
    Complex,
    Bespoke,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuringCase {
    pub id: String,
    pub client_name: String,
    pub title: String,
    pub status: StructuringStatus,
    pub complexity: Complexity,
    pub assigned_fa: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: NaiveDate,
}
