use crate::domain::{Action, RecommendationStatus, Role};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Client,
    Blueprint,
    Recommendation,
    StructuringCase,
    ExecutionTicket,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Client => "client",
            EntityKind::Blueprint => "blueprint",
            EntityKind::Recommendation => "recommendation",
            EntityKind::StructuringCase => "structuring case",
            EntityKind::ExecutionTicket => "execution ticket",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound {
        kind: EntityKind,
        id: String,
    },
    /// A ticket already exists for this recommendation.
    DuplicateTicket {
        recommendation_id: String,
        ticket_id: String,
    },
    /// Tickets are only issued for recommendations in `executing`.
    NotExecuting {
        recommendation_id: String,
        status: RecommendationStatus,
    },
    Forbidden {
        role: Role,
        action: Action,
    },
}

impl StoreError {
    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { kind, id } => write!(f, "{kind} not found (id={id})"),
            StoreError::DuplicateTicket {
                recommendation_id,
                ticket_id,
            } => write!(
                f,
                "recommendation {recommendation_id} already has execution ticket {ticket_id}"
            ),
            StoreError::NotExecuting {
                recommendation_id,
                status,
            } => write!(
                f,
                "recommendation {recommendation_id} is {status}; execution tickets need executing"
            ),
            StoreError::Forbidden { role, action } => {
                write!(f, "role {role} is not permitted to {action:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {}
