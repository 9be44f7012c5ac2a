use crate::domain::{
    Blueprint, BlueprintStatus, Client, Complexity, ExecutionStatus, ExecutionTicket,
    Recommendation, RecommendationStatus, RiskProfile, Role, StructuringCase, StructuringStatus,
    TargetAllocation,
};
use anyhow::{ensure, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Initial contents of a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub current_role: Role,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub blueprints: Vec<Blueprint>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub structuring_cases: Vec<StructuringCase>,
    #[serde(default)]
    pub execution_tickets: Vec<ExecutionTicket>,
}

impl Seed {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let seed: Seed = serde_json::from_str(json).context("seed is not valid JSON")?;
        seed.validate()?;
        Ok(seed)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("invalid seed file {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure_unique("client", self.clients.iter().map(|c| c.id.as_str()))?;
        ensure_unique("blueprint", self.blueprints.iter().map(|b| b.id.as_str()))?;
        ensure_unique(
            "recommendation",
            self.recommendations.iter().map(|r| r.id.as_str()),
        )?;
        ensure_unique(
            "structuring case",
            self.structuring_cases.iter().map(|c| c.id.as_str()),
        )?;
        ensure_unique(
            "execution ticket",
            self.execution_tickets.iter().map(|t| t.id.as_str()),
        )?;

        for blueprint in &self.blueprints {
            let total = blueprint.target_allocation.total();
            ensure!(
                total == 100,
                "blueprint {} target allocation must sum to 100 (got {total})",
                blueprint.id
            );
        }

        let recommendation_ids: BTreeSet<&str> =
            self.recommendations.iter().map(|r| r.id.as_str()).collect();
        let mut ticketed = BTreeSet::<&str>::new();
        for ticket in &self.execution_tickets {
            ensure!(
                recommendation_ids.contains(ticket.recommendation_id.as_str()),
                "execution ticket {} references unknown recommendation {}",
                ticket.id,
                ticket.recommendation_id
            );
            ensure!(
                ticketed.insert(ticket.recommendation_id.as_str()),
                "recommendation {} has more than one execution ticket",
                ticket.recommendation_id
            );
        }

        self.warn_dangling_links();
        Ok(())
    }

    // Client/blueprint links only drive navigation, so a dangling one is tolerated.
    fn warn_dangling_links(&self) {
        let client_ids: BTreeSet<&str> = self.clients.iter().map(|c| c.id.as_str()).collect();
        let blueprint_ids: BTreeSet<&str> =
            self.blueprints.iter().map(|b| b.id.as_str()).collect();

        for client in &self.clients {
            if let Some(blueprint_id) = client.blueprint_id.as_deref() {
                if !blueprint_ids.contains(blueprint_id) {
                    tracing::warn!(client_id = %client.id, %blueprint_id, "client references unknown blueprint");
                }
            }
        }
        for blueprint in &self.blueprints {
            if !client_ids.contains(blueprint.client_id.as_str()) {
                tracing::warn!(blueprint_id = %blueprint.id, client_id = %blueprint.client_id, "blueprint references unknown client");
            }
        }
        for rec in &self.recommendations {
            if !blueprint_ids.contains(rec.blueprint_id.as_str()) {
                tracing::warn!(recommendation_id = %rec.id, blueprint_id = %rec.blueprint_id, "recommendation references unknown blueprint");
            }
        }
    }

    /// The records the demo dashboard starts from.
    pub fn demo() -> Self {
        Self {
            current_role: Role::RelationshipManager,
            clients: vec![
                Client {
                    id: "c-001".to_string(),
                    name: "Eleanor Whitfield".to_string(),
                    email: "eleanor.whitfield@example.com".to_string(),
                    total_aum: 42_500_000,
                    risk_profile: RiskProfile::Balanced,
                    rm_id: "rm-001".to_string(),
                    blueprint_id: Some("bp-001".to_string()),
                },
                Client {
                    id: "c-002".to_string(),
                    name: "Rajiv Menon".to_string(),
                    email: "rajiv.menon@example.com".to_string(),
                    total_aum: 18_750_000,
                    risk_profile: RiskProfile::Growth,
                    rm_id: "rm-001".to_string(),
                    blueprint_id: Some("bp-002".to_string()),
                },
                Client {
                    id: "c-003".to_string(),
                    name: "Sofia Laurent".to_string(),
                    email: "sofia.laurent@example.com".to_string(),
                    total_aum: 65_200_000,
                    risk_profile: RiskProfile::Conservative,
                    rm_id: "rm-002".to_string(),
                    blueprint_id: Some("bp-003".to_string()),
                },
                Client {
                    id: "c-004".to_string(),
                    name: "Kenji Tanaka".to_string(),
                    email: "kenji.tanaka@example.com".to_string(),
                    total_aum: 9_800_000,
                    risk_profile: RiskProfile::Aggressive,
                    rm_id: "rm-002".to_string(),
                    blueprint_id: None,
                },
            ],
            blueprints: vec![
                Blueprint {
                    id: "bp-001".to_string(),
                    client_id: "c-001".to_string(),
                    client_name: "Eleanor Whitfield".to_string(),
                    status: BlueprintStatus::Active,
                    goals: vec![
                        "Preserve capital across generations".to_string(),
                        "Fund philanthropic foundation".to_string(),
                    ],
                    risk_tolerance: "Moderate".to_string(),
                    time_horizon: "10+ years".to_string(),
                    target_allocation: TargetAllocation {
                        equities: 50,
                        fixed_income: 30,
                        alternatives: 15,
                        cash: 5,
                    },
                    created_at: date(2025, 9, 12),
                    updated_at: date(2025, 10, 2),
                },
                Blueprint {
                    id: "bp-002".to_string(),
                    client_id: "c-002".to_string(),
                    client_name: "Rajiv Menon".to_string(),
                    status: BlueprintStatus::Draft,
                    goals: vec![
                        "Grow liquid wealth ahead of liquidity event".to_string(),
                        "Diversify out of single-stock concentration".to_string(),
                    ],
                    risk_tolerance: "High".to_string(),
                    time_horizon: "5-10 years".to_string(),
                    target_allocation: TargetAllocation {
                        equities: 65,
                        fixed_income: 15,
                        alternatives: 15,
                        cash: 5,
                    },
                    created_at: date(2025, 10, 20),
                    updated_at: date(2025, 10, 20),
                },
                Blueprint {
                    id: "bp-003".to_string(),
                    client_id: "c-003".to_string(),
                    client_name: "Sofia Laurent".to_string(),
                    status: BlueprintStatus::Draft,
                    goals: vec![
                        "Stable retirement income".to_string(),
                        "Cross-border estate planning".to_string(),
                    ],
                    risk_tolerance: "Low".to_string(),
                    time_horizon: "3-5 years".to_string(),
                    target_allocation: TargetAllocation {
                        equities: 30,
                        fixed_income: 50,
                        alternatives: 10,
                        cash: 10,
                    },
                    created_at: date(2025, 11, 3),
                    updated_at: date(2025, 11, 3),
                },
            ],
            recommendations: vec![
                Recommendation {
                    id: "rec-001".to_string(),
                    blueprint_id: "bp-001".to_string(),
                    client_name: "Eleanor Whitfield".to_string(),
                    title: "Add global infrastructure exposure".to_string(),
                    description: "Rotate part of the developed-market equity sleeve into listed infrastructure.".to_string(),
                    status: RecommendationStatus::Approved,
                    asset: "Global Infrastructure Fund".to_string(),
                    amount: 2_500_000,
                    rationale: "Inflation-linked cash flows fit the preservation goal.".to_string(),
                    partner: "Northbridge Securities".to_string(),
                    created_by: "rm-001".to_string(),
                    created_at: date(2025, 10, 5),
                },
                Recommendation {
                    id: "rec-002".to_string(),
                    blueprint_id: "bp-001".to_string(),
                    client_name: "Eleanor Whitfield".to_string(),
                    title: "Private credit allocation".to_string(),
                    description: "Fill the alternatives target with a senior secured credit fund.".to_string(),
                    status: RecommendationStatus::Executing,
                    asset: "Senior Secured Private Credit Fund IV".to_string(),
                    amount: 1_750_000,
                    rationale: "Floating-rate income with low equity correlation.".to_string(),
                    partner: "Harbourline Capital".to_string(),
                    created_by: "fa-001".to_string(),
                    created_at: date(2025, 10, 9),
                },
                Recommendation {
                    id: "rec-003".to_string(),
                    blueprint_id: "bp-002".to_string(),
                    client_name: "Rajiv Menon".to_string(),
                    title: "Diversified technology basket".to_string(),
                    description: "Replace single-name concentration with a diversified technology basket.".to_string(),
                    status: RecommendationStatus::Draft,
                    asset: "US Technology Equity Basket".to_string(),
                    amount: 3_000_000,
                    rationale: "Keeps sector conviction while cutting idiosyncratic risk.".to_string(),
                    partner: "Northbridge Securities".to_string(),
                    created_by: "rm-001".to_string(),
                    created_at: date(2025, 10, 22),
                },
                Recommendation {
                    id: "rec-004".to_string(),
                    blueprint_id: "bp-003".to_string(),
                    client_name: "Sofia Laurent".to_string(),
                    title: "Short-duration treasury ladder".to_string(),
                    description: "Build a one-to-three year treasury ladder for income.".to_string(),
                    status: RecommendationStatus::Confirmed,
                    asset: "Short-Duration Treasury Ladder".to_string(),
                    amount: 5_000_000,
                    rationale: "Predictable income with minimal duration risk.".to_string(),
                    partner: "Meridian Custody".to_string(),
                    created_by: "fa-002".to_string(),
                    created_at: date(2025, 11, 4),
                },
            ],
            structuring_cases: vec![
                StructuringCase {
                    id: "sc-001".to_string(),
                    client_name: "Rajiv Menon".to_string(),
                    title: "Singapore family holding company".to_string(),
                    status: StructuringStatus::InProgress,
                    complexity: Complexity::Complex,
                    assigned_fa: "fa-001".to_string(),
                    notes: "Awaiting tax counsel sign-off on dividend routing.".to_string(),
                    created_at: date(2025, 10, 24),
                },
                StructuringCase {
                    id: "sc-002".to_string(),
                    client_name: "Sofia Laurent".to_string(),
                    title: "Luxembourg SICAV feeder setup".to_string(),
                    status: StructuringStatus::NotStarted,
                    complexity: Complexity::Bespoke,
                    assigned_fa: "fa-002".to_string(),
                    notes: String::new(),
                    created_at: date(2025, 11, 6),
                },
                StructuringCase {
                    id: "sc-003".to_string(),
                    client_name: "Eleanor Whitfield".to_string(),
                    title: "UK ISA transfer".to_string(),
                    status: StructuringStatus::Completed,
                    complexity: Complexity::Standard,
                    assigned_fa: "fa-001".to_string(),
                    notes: "Transfer settled.".to_string(),
                    created_at: date(2025, 9, 15),
                },
            ],
            execution_tickets: vec![
                ExecutionTicket {
                    id: "EXE-001".to_string(),
                    recommendation_id: "rec-002".to_string(),
                    client_name: "Eleanor Whitfield".to_string(),
                    asset: "Senior Secured Private Credit Fund IV".to_string(),
                    amount: 1_750_000,
                    status: ExecutionStatus::Submitted,
                    partner: "Harbourline Capital".to_string(),
                    created_at: at(2025, 10, 12, 14, 5),
                    confirmed_at: None,
                },
                ExecutionTicket {
                    id: "EXE-002".to_string(),
                    recommendation_id: "rec-004".to_string(),
                    client_name: "Sofia Laurent".to_string(),
                    asset: "Short-Duration Treasury Ladder".to_string(),
                    amount: 5_000_000,
                    status: ExecutionStatus::Confirmed,
                    partner: "Meridian Custody".to_string(),
                    created_at: at(2025, 11, 7, 9, 30),
                    confirmed_at: Some(at(2025, 11, 10, 16, 45)),
                },
            ],
        }
    }
}

fn ensure_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> anyhow::Result<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        ensure!(!id.trim().is_empty(), "{kind} id must be non-empty");
        ensure!(seen.insert(id), "duplicate {kind} id: {id}");
    }
    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    date(year, month, day)
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_default()
        .and_utc()
}
