use crate::domain::{BlueprintStatus, ExecutionStatus, RecommendationStatus, StructuringStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    #[default]
    #[serde(alias = "rm")]
    RelationshipManager,
    #[serde(alias = "fa")]
    FinancialAdvisor,
    #[serde(alias = "admin")]
    Administrator,
}

/// Workflow controls a persona may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    AdvanceBlueprint,
    ApproveRecommendation,
    ExecuteRecommendation,
    ConfirmRecommendation,
    AdvanceStructuring,
    AdvanceExecution,
    CreateExecutionTicket,
    /// Setting an arbitrary status, bypassing the forward-only controls.
    OverrideStatus,
    ResetDemo,
}

impl Action {
    pub fn advancing_blueprint(from: BlueprintStatus) -> Option<Action> {
        match from {
            BlueprintStatus::Draft => Some(Action::AdvanceBlueprint),
            BlueprintStatus::Active => None,
        }
    }

    pub fn advancing_recommendation(from: RecommendationStatus) -> Option<Action> {
        match from {
            RecommendationStatus::Draft => Some(Action::ApproveRecommendation),
            RecommendationStatus::Approved => Some(Action::ExecuteRecommendation),
            RecommendationStatus::Executing => Some(Action::ConfirmRecommendation),
            RecommendationStatus::Confirmed => None,
        }
    }

    pub fn advancing_structuring(from: StructuringStatus) -> Option<Action> {
        match from {
            StructuringStatus::NotStarted | StructuringStatus::InProgress => {
                Some(Action::AdvanceStructuring)
            }
            StructuringStatus::Completed => None,
        }
    }

    pub fn advancing_execution(from: ExecutionStatus) -> Option<Action> {
        match from {
            ExecutionStatus::Confirmed => None,
            _ => Some(Action::AdvanceExecution),
        }
    }
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Client,
        Role::RelationshipManager,
        Role::FinancialAdvisor,
        Role::Administrator,
    ];

    pub fn permits(self, action: Action) -> bool {
        match self {
            Role::Client => false,
            Role::RelationshipManager => matches!(
                action,
                Action::AdvanceBlueprint | Action::ApproveRecommendation
            ),
            Role::FinancialAdvisor => matches!(
                action,
                Action::ExecuteRecommendation
                    | Action::ConfirmRecommendation
                    | Action::AdvanceStructuring
                    | Action::CreateExecutionTicket
            ),
            Role::Administrator => true,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::RelationshipManager => "Relationship Manager",
            Role::FinancialAdvisor => "Financial Advisor",
            Role::Administrator => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Client => "client",
            Role::RelationshipManager => "relationship_manager",
            Role::FinancialAdvisor => "financial_advisor",
            Role::Administrator => "administrator",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "rm" | "relationship_manager" => Ok(Role::RelationshipManager),
            "fa" | "financial_advisor" => Ok(Role::FinancialAdvisor),
            "admin" | "administrator" => Ok(Role::Administrator),
            other => anyhow::bail!("unknown role: {other}"),
        }
    }
}
