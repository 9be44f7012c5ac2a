//! Role-filtered read models derived from a [`StoreSnapshot`].

use crate::domain::{Action, Client, Role, Workflow};
use crate::store::{EntityKind, StoreError, StoreSnapshot};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// Something the viewing role can move forward right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub kind: String,
    pub id: String,
    pub title: String,
    pub client_name: String,
    pub status: String,
    pub action: Action,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub role: Role,
    pub role_label: &'static str,
    pub revision: u64,
    /// Set when the view is narrowed to one client.
    pub client_id: Option<String>,
    pub client_count: usize,
    pub total_aum: u64,
    pub blueprints: Vec<StatusCount>,
    pub recommendations: Vec<StatusCount>,
    pub structuring: Vec<StatusCount>,
    pub executions: Vec<StatusCount>,
    pub work_items: Vec<WorkItem>,
}

/// Builds the dashboard `role` sees. A client always sees a single client: the
/// one named by `client_id`, or the first seeded client when none is given.
/// Other roles see every client unless `client_id` narrows the view.
pub fn dashboard(
    snapshot: &StoreSnapshot,
    role: Role,
    client_id: Option<&str>,
) -> Result<Dashboard, StoreError> {
    let focus: Option<&Client> = match (role, client_id) {
        (_, Some(id)) => Some(
            snapshot
                .clients
                .iter()
                .find(|c| c.id == id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Client, id))?,
        ),
        (Role::Client, None) => snapshot.clients.first(),
        (_, None) => None,
    };

    let clients: Vec<&Client> = match focus {
        Some(client) => vec![client],
        None => snapshot.clients.iter().collect(),
    };
    let client_ids: BTreeSet<&str> = clients.iter().map(|c| c.id.as_str()).collect();
    let client_names: BTreeSet<&str> = clients.iter().map(|c| c.name.as_str()).collect();

    let blueprints: Vec<_> = snapshot
        .blueprints
        .iter()
        .filter(|b| focus.is_none() || client_ids.contains(b.client_id.as_str()))
        .collect();
    let blueprint_ids: BTreeSet<&str> = blueprints.iter().map(|b| b.id.as_str()).collect();

    let recommendations: Vec<_> = snapshot
        .recommendations
        .iter()
        .filter(|r| focus.is_none() || blueprint_ids.contains(r.blueprint_id.as_str()))
        .collect();
    let recommendation_ids: BTreeSet<&str> =
        recommendations.iter().map(|r| r.id.as_str()).collect();

    let structuring: Vec<_> = snapshot
        .structuring_cases
        .iter()
        .filter(|c| focus.is_none() || client_names.contains(c.client_name.as_str()))
        .collect();

    let tickets: Vec<_> = snapshot
        .execution_tickets
        .iter()
        .filter(|t| focus.is_none() || recommendation_ids.contains(t.recommendation_id.as_str()))
        .collect();

    let mut work_items = Vec::new();
    for b in &blueprints {
        if let Some(action) = permitted(role, Action::advancing_blueprint(b.status)) {
            work_items.push(WorkItem {
                kind: EntityKind::Blueprint.to_string(),
                id: b.id.clone(),
                title: b.goals.first().cloned().unwrap_or_default(),
                client_name: b.client_name.clone(),
                status: b.status.to_string(),
                action,
            });
        }
    }
    for r in &recommendations {
        if let Some(action) = permitted(role, Action::advancing_recommendation(r.status)) {
            work_items.push(WorkItem {
                kind: EntityKind::Recommendation.to_string(),
                id: r.id.clone(),
                title: r.title.clone(),
                client_name: r.client_name.clone(),
                status: r.status.to_string(),
                action,
            });
        }
    }
    for c in &structuring {
        if let Some(action) = permitted(role, Action::advancing_structuring(c.status)) {
            work_items.push(WorkItem {
                kind: EntityKind::StructuringCase.to_string(),
                id: c.id.clone(),
                title: c.title.clone(),
                client_name: c.client_name.clone(),
                status: c.status.to_string(),
                action,
            });
        }
    }
    for t in &tickets {
        if let Some(action) = permitted(role, Action::advancing_execution(t.status)) {
            work_items.push(WorkItem {
                kind: EntityKind::ExecutionTicket.to_string(),
                id: t.id.clone(),
                title: t.asset.clone(),
                client_name: t.client_name.clone(),
                status: t.status.to_string(),
                action,
            });
        }
    }

    Ok(Dashboard {
        role,
        role_label: role.label(),
        revision: snapshot.revision,
        client_id: focus.map(|c| c.id.clone()),
        client_count: clients.len(),
        total_aum: clients.iter().map(|c| c.total_aum).sum(),
        blueprints: count_by_status(blueprints.iter().map(|b| b.status)),
        recommendations: count_by_status(recommendations.iter().map(|r| r.status)),
        structuring: count_by_status(structuring.iter().map(|c| c.status)),
        executions: count_by_status(tickets.iter().map(|t| t.status)),
        work_items,
    })
}

fn permitted(role: Role, action: Option<Action>) -> Option<Action> {
    action.filter(|a| role.permits(*a))
}

/// Counts per status, in workflow order, including zero counts.
pub fn count_by_status<S: Workflow>(statuses: impl Iterator<Item = S>) -> Vec<StatusCount> {
    let statuses: Vec<S> = statuses.collect();
    let mut out = Vec::new();
    let mut next = Some(S::INITIAL);
    while let Some(status) = next {
        out.push(StatusCount {
            status: status.to_string(),
            count: statuses.iter().filter(|s| **s == status).count(),
        });
        next = status.next();
    }
    out
}
