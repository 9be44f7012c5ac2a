pub mod error;
pub mod events;
pub mod guard;

use crate::domain::{
    Advance, Blueprint, BlueprintStatus, Client, ExecutionStatus, ExecutionTicket,
    Recommendation, RecommendationStatus, Role, StructuringCase, StructuringStatus,
};
use crate::fixtures::Seed;
use crate::time::clock::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

pub use error::{EntityKind, StoreError};
pub use events::StoreEvent;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Read model of the whole store at one revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub revision: u64,
    pub current_role: Role,
    pub clients: Vec<Client>,
    pub blueprints: Vec<Blueprint>,
    pub recommendations: Vec<Recommendation>,
    pub structuring_cases: Vec<StructuringCase>,
    pub execution_tickets: Vec<ExecutionTicket>,
}

/// Outcome of a recommendation status change. `ticket` is set only when this
/// change created the execution ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationUpdate {
    pub recommendation: Recommendation,
    pub ticket: Option<ExecutionTicket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationAdvance {
    pub advance: Advance<RecommendationStatus>,
    pub recommendation: Recommendation,
    pub ticket: Option<ExecutionTicket>,
}

/// In-memory state container for the dashboard. Every mutation goes through a
/// named operation, bumps `revision`, and is published to subscribers.
pub struct DashboardStore {
    clients: Vec<Client>,
    blueprints: Vec<Blueprint>,
    recommendations: Vec<Recommendation>,
    structuring_cases: Vec<StructuringCase>,
    execution_tickets: Vec<ExecutionTicket>,
    current_role: Role,
    revision: u64,
    ticket_seq: u64,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<StoreEvent>,
}

impl std::fmt::Debug for DashboardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardStore")
            .field("revision", &self.revision)
            .field("current_role", &self.current_role)
            .field("clients", &self.clients.len())
            .field("blueprints", &self.blueprints.len())
            .field("recommendations", &self.recommendations.len())
            .field("structuring_cases", &self.structuring_cases.len())
            .field("execution_tickets", &self.execution_tickets.len())
            .finish()
    }
}

impl DashboardStore {
    pub fn new(seed: Seed, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        seed.validate()?;
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            clients: seed.clients,
            blueprints: seed.blueprints,
            recommendations: seed.recommendations,
            structuring_cases: seed.structuring_cases,
            execution_tickets: seed.execution_tickets,
            current_role: seed.current_role,
            revision: 0,
            ticket_seq: 0,
            clock,
            events,
        })
    }

    /// Store seeded with the built-in demo records and the system clock.
    pub fn demo() -> anyhow::Result<Self> {
        Self::new(Seed::demo(), Arc::new(SystemClock))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn current_role(&self) -> Role {
        self.current_role
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn blueprints(&self) -> &[Blueprint] {
        &self.blueprints
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn structuring_cases(&self) -> &[StructuringCase] {
        &self.structuring_cases
    }

    pub fn execution_tickets(&self) -> &[ExecutionTicket] {
        &self.execution_tickets
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn blueprint(&self, id: &str) -> Option<&Blueprint> {
        self.blueprints.iter().find(|b| b.id == id)
    }

    pub fn recommendation(&self, id: &str) -> Option<&Recommendation> {
        self.recommendations.iter().find(|r| r.id == id)
    }

    pub fn structuring_case(&self, id: &str) -> Option<&StructuringCase> {
        self.structuring_cases.iter().find(|c| c.id == id)
    }

    pub fn execution_ticket(&self, id: &str) -> Option<&ExecutionTicket> {
        self.execution_tickets.iter().find(|t| t.id == id)
    }

    pub fn tickets_for_recommendation(&self, recommendation_id: &str) -> Vec<&ExecutionTicket> {
        self.execution_tickets
            .iter()
            .filter(|t| t.recommendation_id == recommendation_id)
            .collect()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            revision: self.revision,
            current_role: self.current_role,
            clients: self.clients.clone(),
            blueprints: self.blueprints.clone(),
            recommendations: self.recommendations.clone(),
            structuring_cases: self.structuring_cases.clone(),
            execution_tickets: self.execution_tickets.clone(),
        }
    }

    pub fn set_current_role(&mut self, role: Role) {
        self.current_role = role;
        tracing::info!(%role, "active role changed");
        self.publish(|revision| StoreEvent::RoleChanged { revision, role });
    }

    pub fn update_blueprint_status(
        &mut self,
        id: &str,
        status: BlueprintStatus,
    ) -> Result<Blueprint, StoreError> {
        let today = self.clock.today();
        let blueprint = self
            .blueprints
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Blueprint, id))?;

        blueprint.status = status;
        blueprint.updated_at = today;
        let updated = blueprint.clone();

        tracing::info!(%id, %status, "blueprint status updated");
        self.publish(|revision| StoreEvent::BlueprintUpdated {
            revision,
            id: updated.id.clone(),
            status,
        });
        Ok(updated)
    }

    pub fn advance_blueprint(&mut self, id: &str) -> Result<Advance<BlueprintStatus>, StoreError> {
        let current = self
            .blueprint(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Blueprint, id))?
            .status;
        let advance = Advance::from_status(current);
        if let Advance::Moved { to, .. } = advance {
            self.update_blueprint_status(id, to)?;
        }
        Ok(advance)
    }

    /// Sets the status as given. Entering `executing` creates the execution
    /// ticket in the same operation unless the recommendation already has one.
    pub fn update_recommendation_status(
        &mut self,
        id: &str,
        status: RecommendationStatus,
    ) -> Result<RecommendationUpdate, StoreError> {
        let index = self
            .recommendations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Recommendation, id))?;

        let needs_ticket =
            status.requires_ticket() && self.tickets_for_recommendation(id).is_empty();

        self.recommendations[index].status = status;
        let recommendation = self.recommendations[index].clone();

        tracing::info!(%id, %status, "recommendation status updated");
        self.publish(|revision| StoreEvent::RecommendationUpdated {
            revision,
            id: recommendation.id.clone(),
            status,
        });

        let ticket = if needs_ticket {
            Some(self.insert_ticket(&recommendation))
        } else {
            None
        };

        Ok(RecommendationUpdate {
            recommendation,
            ticket,
        })
    }

    pub fn advance_recommendation(&mut self, id: &str) -> Result<RecommendationAdvance, StoreError> {
        let current = self
            .recommendation(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Recommendation, id))?;
        let advance = Advance::from_status(current.status);

        let Advance::Moved { to, .. } = advance else {
            return Ok(RecommendationAdvance {
                advance,
                recommendation: current.clone(),
                ticket: None,
            });
        };

        let update = self.update_recommendation_status(id, to)?;
        Ok(RecommendationAdvance {
            advance,
            recommendation: update.recommendation,
            ticket: update.ticket,
        })
    }

    pub fn update_structuring_status(
        &mut self,
        id: &str,
        status: StructuringStatus,
    ) -> Result<StructuringCase, StoreError> {
        let case = self
            .structuring_cases
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::StructuringCase, id))?;

        case.status = status;
        let updated = case.clone();

        tracing::info!(%id, %status, "structuring status updated");
        self.publish(|revision| StoreEvent::StructuringUpdated {
            revision,
            id: updated.id.clone(),
            status,
        });
        Ok(updated)
    }

    pub fn advance_structuring(
        &mut self,
        id: &str,
    ) -> Result<Advance<StructuringStatus>, StoreError> {
        let current = self
            .structuring_case(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::StructuringCase, id))?
            .status;
        let advance = Advance::from_status(current);
        if let Advance::Moved { to, .. } = advance {
            self.update_structuring_status(id, to)?;
        }
        Ok(advance)
    }

    /// Stamps `confirmed_at` when the new status is `confirmed`. Any other status
    /// leaves an existing stamp in place.
    pub fn update_execution_status(
        &mut self,
        id: &str,
        status: ExecutionStatus,
    ) -> Result<ExecutionTicket, StoreError> {
        let now = self.clock.now();
        let ticket = self
            .execution_tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::ExecutionTicket, id))?;

        ticket.status = status;
        if status == ExecutionStatus::Confirmed {
            ticket.confirmed_at = Some(now);
        }
        let updated = ticket.clone();

        tracing::info!(%id, %status, "execution status updated");
        self.publish(|revision| StoreEvent::ExecutionUpdated {
            revision,
            id: updated.id.clone(),
            status,
        });
        Ok(updated)
    }

    pub fn advance_execution(&mut self, id: &str) -> Result<Advance<ExecutionStatus>, StoreError> {
        let current = self
            .execution_ticket(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::ExecutionTicket, id))?
            .status;
        let advance = Advance::from_status(current);
        if let Advance::Moved { to, .. } = advance {
            self.update_execution_status(id, to)?;
        }
        Ok(advance)
    }

    /// Creates the execution ticket for a stored recommendation that is already
    /// `executing` but has none, e.g. one seeded that way. Ticket fields are
    /// copied from the stored record. A recommendation gets at most one ticket.
    pub fn create_execution_ticket(
        &mut self,
        recommendation_id: &str,
    ) -> Result<ExecutionTicket, StoreError> {
        let recommendation = self
            .recommendation(recommendation_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Recommendation, recommendation_id))?
            .clone();

        if !recommendation.status.requires_ticket() {
            tracing::warn!(
                %recommendation_id,
                status = %recommendation.status,
                "recommendation is not executing; refusing ticket"
            );
            return Err(StoreError::NotExecuting {
                recommendation_id: recommendation.id,
                status: recommendation.status,
            });
        }

        if let Some(existing) = self
            .execution_tickets
            .iter()
            .find(|t| t.recommendation_id == recommendation_id)
        {
            tracing::warn!(
                %recommendation_id,
                ticket_id = %existing.id,
                "execution ticket already exists; refusing duplicate"
            );
            return Err(StoreError::DuplicateTicket {
                recommendation_id: recommendation.id,
                ticket_id: existing.id.clone(),
            });
        }

        Ok(self.insert_ticket(&recommendation))
    }

    /// Reloads every collection from `seed`. Subscribers stay attached and the
    /// revision keeps counting.
    pub fn reset(&mut self, seed: Seed) -> anyhow::Result<()> {
        seed.validate()?;
        self.clients = seed.clients;
        self.blueprints = seed.blueprints;
        self.recommendations = seed.recommendations;
        self.structuring_cases = seed.structuring_cases;
        self.execution_tickets = seed.execution_tickets;
        self.current_role = seed.current_role;

        tracing::info!("store reset from seed");
        self.publish(|revision| StoreEvent::Reset { revision });
        Ok(())
    }

    fn insert_ticket(&mut self, recommendation: &Recommendation) -> ExecutionTicket {
        let now = self.clock.now();
        self.ticket_seq += 1;
        let id = format!("EXE-{}-{}", now.timestamp_millis(), self.ticket_seq);
        let ticket = ExecutionTicket::from_recommendation(id, recommendation, now);
        self.execution_tickets.push(ticket.clone());

        tracing::info!(
            ticket_id = %ticket.id,
            recommendation_id = %ticket.recommendation_id,
            amount = ticket.amount,
            partner = %ticket.partner,
            "execution ticket created"
        );
        self.publish(|revision| StoreEvent::TicketCreated {
            revision,
            id: ticket.id.clone(),
            recommendation_id: ticket.recommendation_id.clone(),
        });
        ticket
    }

    fn publish(&mut self, event: impl FnOnce(u64) -> StoreEvent) {
        self.revision += 1;
        let event = event(self.revision);
        // No receivers is the normal case outside of a running view layer.
        let _ = self.events.send(event);
    }
}
