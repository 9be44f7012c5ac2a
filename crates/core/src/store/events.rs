use crate::domain::{
    BlueprintStatus, ExecutionStatus, RecommendationStatus, Role, StructuringStatus,
};
use serde::Serialize;

/// Published after every successful mutation. `revision` is the store revision
/// the mutation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    RoleChanged {
        revision: u64,
        role: Role,
    },
    BlueprintUpdated {
        revision: u64,
        id: String,
        status: BlueprintStatus,
    },
    RecommendationUpdated {
        revision: u64,
        id: String,
        status: RecommendationStatus,
    },
    StructuringUpdated {
        revision: u64,
        id: String,
        status: StructuringStatus,
    },
    ExecutionUpdated {
        revision: u64,
        id: String,
        status: ExecutionStatus,
    },
    TicketCreated {
        revision: u64,
        id: String,
        recommendation_id: String,
    },
    Reset {
        revision: u64,
    },
}

impl StoreEvent {
    pub fn revision(&self) -> u64 {
        match self {
            StoreEvent::RoleChanged { revision, .. }
            | StoreEvent::BlueprintUpdated { revision, .. }
            | StoreEvent::RecommendationUpdated { revision, .. }
            | StoreEvent::StructuringUpdated { revision, .. }
            | StoreEvent::ExecutionUpdated { revision, .. }
            | StoreEvent::TicketCreated { revision, .. }
            | StoreEvent::Reset { revision } => *revision,
        }
    }
}
