use wealthdesk_core::domain::{
    Action, ExecutionStatus, RecommendationStatus, Role, StructuringStatus, Workflow,
};
use wealthdesk_core::remote::DashboardClient;
use wealthdesk_core::store::StoreSnapshot;

/// Entities the walkthrough moves for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub client_id: String,
    pub client_name: String,
    pub blueprint_id: Option<String>,
    pub recommendation_id: Option<String>,
    pub structuring_case_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub steps: Vec<String>,
    pub ticket_id: Option<String>,
}

pub fn plan(snapshot: &StoreSnapshot, client_id: &str) -> anyhow::Result<Plan> {
    let client = snapshot
        .clients
        .iter()
        .find(|c| c.id == client_id)
        .ok_or_else(|| anyhow::anyhow!("unknown client: {client_id}"))?;

    let blueprint = client
        .blueprint_id
        .as_deref()
        .and_then(|id| snapshot.blueprints.iter().find(|b| b.id == id))
        .or_else(|| snapshot.blueprints.iter().find(|b| b.client_id == client.id));

    // Earliest unfinished recommendation drives the story.
    let recommendation = blueprint.and_then(|b| {
        snapshot
            .recommendations
            .iter()
            .filter(|r| r.blueprint_id == b.id && !r.status.is_terminal())
            .min_by_key(|r| r.status.ordinal())
    });

    let structuring = snapshot
        .structuring_cases
        .iter()
        .find(|c| c.client_name == client.name && !c.status.is_terminal());

    Ok(Plan {
        client_id: client.id.clone(),
        client_name: client.name.clone(),
        blueprint_id: blueprint.map(|b| b.id.clone()),
        recommendation_id: recommendation.map(|r| r.id.clone()),
        structuring_case_id: structuring.map(|c| c.id.clone()),
    })
}

/// Least-privileged persona shown the control for `action`.
pub fn presenter_role(action: Action) -> Role {
    Role::ALL
        .into_iter()
        .find(|role| role.permits(action))
        .unwrap_or(Role::Administrator)
}

/// Clicks through blueprint activation, recommendation approval and execution,
/// structuring, and ticket fulfilment, switching persona before each control.
pub async fn run(client: &dyn DashboardClient, plan: &Plan) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();

    if let Some(id) = plan.blueprint_id.as_deref() {
        client
            .set_role(presenter_role(Action::AdvanceBlueprint))
            .await?;
        let advance = client.advance_blueprint(id).await?;
        if advance.moved() {
            summary
                .steps
                .push(format!("blueprint {id} -> {}", advance.status()));
        }
    }

    let mut ticket_id = None;
    if let Some(id) = plan.recommendation_id.as_deref() {
        // Approve, then hand over to execution; stop short of confirming until the ticket lands.
        for from in [RecommendationStatus::Draft, RecommendationStatus::Approved] {
            let current = recommendation_status(client, id).await?;
            if current != from {
                continue;
            }
            let Some(action) = Action::advancing_recommendation(current) else {
                break;
            };
            client.set_role(presenter_role(action)).await?;
            let step = client.advance_recommendation(id).await?;
            summary
                .steps
                .push(format!("recommendation {id} -> {}", step.advance.status()));
            if let Some(ticket) = step.ticket {
                tracing::info!(ticket_id = %ticket.id, recommendation_id = %id, "execution ticket created");
                ticket_id = Some(ticket.id);
            }
        }

        if ticket_id.is_none() {
            let snapshot = client.snapshot().await?;
            ticket_id = snapshot
                .execution_tickets
                .iter()
                .find(|t| t.recommendation_id == id)
                .map(|t| t.id.clone());
        }
    }

    if let Some(id) = plan.structuring_case_id.as_deref() {
        client
            .set_role(presenter_role(Action::AdvanceStructuring))
            .await?;
        loop {
            let advance = client.advance_structuring(id).await?;
            if !advance.moved() {
                break;
            }
            summary
                .steps
                .push(format!("structuring {id} -> {}", advance.status()));
            if advance.status() == StructuringStatus::Completed {
                break;
            }
        }
    }

    if let Some(id) = ticket_id.as_deref() {
        client
            .set_role(presenter_role(Action::AdvanceExecution))
            .await?;
        loop {
            let advance = client.advance_execution(id).await?;
            if !advance.moved() {
                break;
            }
            summary
                .steps
                .push(format!("execution {id} -> {}", advance.status()));
            if advance.status() == ExecutionStatus::Confirmed {
                break;
            }
        }
    }

    if let Some(id) = plan.recommendation_id.as_deref() {
        if recommendation_status(client, id).await? == RecommendationStatus::Executing {
            client
                .set_role(presenter_role(Action::ConfirmRecommendation))
                .await?;
            let step = client.advance_recommendation(id).await?;
            summary
                .steps
                .push(format!("recommendation {id} -> {}", step.advance.status()));
        }
    }

    summary.ticket_id = ticket_id;
    Ok(summary)
}

async fn recommendation_status(
    client: &dyn DashboardClient,
    id: &str,
) -> anyhow::Result<RecommendationStatus> {
    let snapshot = client.snapshot().await?;
    snapshot
        .recommendations
        .iter()
        .find(|r| r.id == id)
        .map(|r| r.status)
        .ok_or_else(|| anyhow::anyhow!("recommendation {id} disappeared"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wealthdesk_core::domain::BlueprintStatus;
    use wealthdesk_core::fixtures::Seed;
    use wealthdesk_core::remote::LocalDashboardClient;
    use wealthdesk_core::store::DashboardStore;

    fn local() -> LocalDashboardClient {
        LocalDashboardClient::new(DashboardStore::demo().unwrap(), Seed::demo())
    }

    #[test]
    fn presenter_roles_are_least_privileged() {
        assert_eq!(
            presenter_role(Action::ApproveRecommendation),
            Role::RelationshipManager
        );
        assert_eq!(
            presenter_role(Action::ExecuteRecommendation),
            Role::FinancialAdvisor
        );
        assert_eq!(presenter_role(Action::AdvanceExecution), Role::Administrator);
    }

    #[tokio::test]
    async fn plan_picks_open_work_for_client() {
        let client = local();
        let snapshot = client.snapshot().await.unwrap();
        let plan = plan(&snapshot, "c-002").unwrap();
        assert_eq!(plan.blueprint_id.as_deref(), Some("bp-002"));
        assert_eq!(plan.recommendation_id.as_deref(), Some("rec-003"));
        assert_eq!(plan.structuring_case_id.as_deref(), Some("sc-001"));

        assert!(super::plan(&snapshot, "c-999").is_err());
    }

    #[tokio::test]
    async fn full_walkthrough_reaches_terminal_states() {
        let client = local();
        let snapshot = client.snapshot().await.unwrap();
        let plan = plan(&snapshot, "c-002").unwrap();

        let summary = run(&client, &plan).await.unwrap();

        let snapshot = client.snapshot().await.unwrap();
        let blueprint = snapshot.blueprints.iter().find(|b| b.id == "bp-002").unwrap();
        assert_eq!(blueprint.status, BlueprintStatus::Active);
        let rec = snapshot
            .recommendations
            .iter()
            .find(|r| r.id == "rec-003")
            .unwrap();
        assert_eq!(rec.status, RecommendationStatus::Confirmed);
        let case = snapshot
            .structuring_cases
            .iter()
            .find(|c| c.id == "sc-001")
            .unwrap();
        assert_eq!(case.status, StructuringStatus::Completed);

        let tickets: Vec<_> = snapshot
            .execution_tickets
            .iter()
            .filter(|t| t.recommendation_id == "rec-003")
            .collect();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status, ExecutionStatus::Confirmed);
        assert!(tickets[0].confirmed_at.is_some());
        assert_eq!(summary.ticket_id.as_deref(), Some(tickets[0].id.as_str()));

        // blueprint, approve, execute, structuring, three ticket steps, confirm
        assert_eq!(summary.steps.len(), 8);
    }

    #[tokio::test]
    async fn rerun_on_finished_client_moves_nothing() {
        let client = local();
        let snapshot = client.snapshot().await.unwrap();
        let first = plan(&snapshot, "c-002").unwrap();
        run(&client, &first).await.unwrap();

        let snapshot = client.snapshot().await.unwrap();
        let second = plan(&snapshot, "c-002").unwrap();
        assert!(second.recommendation_id.is_none());
        let summary = run(&client, &second).await.unwrap();
        assert!(summary.steps.is_empty());
    }
}
