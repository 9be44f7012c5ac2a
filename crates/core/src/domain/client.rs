use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Balanced,
    Growth,
    Aggressive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub total_aum: u64,
    pub risk_profile: RiskProfile,
    pub rm_id: String,
    #[serde(default)]
    pub blueprint_id: Option<String>,
}
