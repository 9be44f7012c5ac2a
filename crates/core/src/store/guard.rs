use crate::domain::{Action, Role};
use crate::store::{DashboardStore, EntityKind, StoreError};

/// Fails with `Forbidden` unless `role` may perform `action`. `None` means the
/// command is a no-op and needs no permission.
pub fn authorize(role: Role, action: Option<Action>) -> Result<(), StoreError> {
    match action {
        Some(action) if !role.permits(action) => {
            tracing::warn!(%role, ?action, "action refused for role");
            Err(StoreError::Forbidden { role, action })
        }
        _ => Ok(()),
    }
}

// Store operations never look at the role; persona-facing callers check here first.
impl DashboardStore {
    /// The action advancing `id` one step requires, `None` when already terminal.
    pub fn advance_action(&self, kind: EntityKind, id: &str) -> Result<Option<Action>, StoreError> {
        let missing = || StoreError::not_found(kind, id);
        let action = match kind {
            EntityKind::Blueprint => {
                Action::advancing_blueprint(self.blueprint(id).ok_or_else(missing)?.status)
            }
            EntityKind::Recommendation => Action::advancing_recommendation(
                self.recommendation(id).ok_or_else(missing)?.status,
            ),
            EntityKind::StructuringCase => Action::advancing_structuring(
                self.structuring_case(id).ok_or_else(missing)?.status,
            ),
            EntityKind::ExecutionTicket => {
                Action::advancing_execution(self.execution_ticket(id).ok_or_else(missing)?.status)
            }
            EntityKind::Client => return Err(missing()),
        };
        Ok(action)
    }

    pub fn authorize_advance(&self, kind: EntityKind, id: &str) -> Result<(), StoreError> {
        authorize(self.current_role(), self.advance_action(kind, id)?)
    }

    pub fn authorize(&self, action: Action) -> Result<(), StoreError> {
        authorize(self.current_role(), Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Seed;
    use crate::time::clock::SystemClock;
    use std::sync::Arc;

    fn store() -> DashboardStore {
        DashboardStore::new(Seed::demo(), Arc::new(SystemClock)).unwrap()
    }

    #[test]
    fn advance_action_depends_on_current_status() {
        let store = store();
        assert_eq!(
            store
                .advance_action(EntityKind::Recommendation, "rec-003")
                .unwrap(),
            Some(Action::ApproveRecommendation)
        );
        assert_eq!(
            store
                .advance_action(EntityKind::Recommendation, "rec-004")
                .unwrap(),
            None
        );
        assert!(store.advance_action(EntityKind::Client, "c-001").is_err());
    }

    #[test]
    fn rm_cannot_push_execution() {
        let store = store();
        let err = store
            .authorize_advance(EntityKind::ExecutionTicket, "EXE-001")
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Forbidden {
                role: Role::RelationshipManager,
                action: Action::AdvanceExecution,
            }
        );
        store
            .authorize_advance(EntityKind::Blueprint, "bp-002")
            .unwrap();
    }

    #[test]
    fn terminal_advance_needs_no_permission() {
        let mut store = store();
        store.set_current_role(Role::Client);
        store
            .authorize_advance(EntityKind::ExecutionTicket, "EXE-002")
            .unwrap();
        assert!(store.authorize(Action::ResetDemo).is_err());
    }
}
