use crate::errors::{AppError, AppResult};
use crate::mutation::{CustomerTarget, Mutation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// What the user sees for a staged mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedProposal {
    pub id: String,
    pub tool: String,
    pub description: String,
    pub preview: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingEntry {
    proposal: StagedProposal,
    mutation: Mutation,
}

/// Holds proposals between staging and resolution. A proposal is not a
/// reservation: the state may move on while it waits.
#[derive(Clone, Default)]
pub struct ConfirmationGate {
    pending: Arc<Mutex<Vec<PendingEntry>>>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, mutation: Mutation, preview: Value) -> AppResult<StagedProposal> {
        let proposal = StagedProposal {
            id: Uuid::new_v4().to_string(),
            tool: mutation.tool_name().to_string(),
            description: mutation.describe(),
            preview,
            created_at: Utc::now(),
        };

        let mut pending = self.lock()?;
        pending.push(PendingEntry {
            proposal: proposal.clone(),
            mutation,
        });

        Ok(proposal)
    }

    /// Remove a proposal and hand back its mutation. Each proposal resolves once.
    pub fn take(&self, proposal_id: &str) -> AppResult<(StagedProposal, Mutation)> {
        let mut pending = self.lock()?;
        let Some(index) = pending.iter().position(|entry| entry.proposal.id == proposal_id) else {
            return Err(AppError::NotFound(format!("No pending proposal with id {}", proposal_id)));
        };
        let entry = pending.remove(index);
        Ok((entry.proposal, entry.mutation))
    }

    /// Open proposals in the order they were staged.
    pub fn pending(&self) -> AppResult<Vec<StagedProposal>> {
        let pending = self.lock()?;
        Ok(pending.iter().map(|entry| entry.proposal.clone()).collect())
    }

    /// Drop every open proposal aimed at `target`.
    pub fn cancel_targeting(&self, target: CustomerTarget) -> AppResult<Vec<StagedProposal>> {
        let mut pending = self.lock()?;
        let (cancelled, kept): (Vec<_>, Vec<_>) = pending
            .drain(..)
            .partition(|entry| entry.mutation.customer_target() == Some(target));
        *pending = kept;
        Ok(cancelled.into_iter().map(|entry| entry.proposal).collect())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Vec<PendingEntry>>> {
        self.pending
            .lock()
            .map_err(|_| AppError::Internal("confirmation gate mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::ConfirmationGate;
    use crate::customers::{DeleteCustomerArgs, UpdateCustomerArgs};
    use crate::errors::AppError;
    use crate::models::CustomerPool;
    use crate::mutation::{CustomerTarget, Mutation, TitleArgs};
    use serde_json::json;

    fn rename(title: &str) -> Mutation {
        Mutation::SetDashboardTitle(TitleArgs {
            title: title.to_string(),
        })
    }

    fn edit(pool: CustomerPool, id: i64) -> Mutation {
        Mutation::UpdateCustomer(UpdateCustomerArgs {
            pool,
            id,
            business_name: Some("Renamed".to_string()),
            phone_number: None,
            email_address: None,
            links: None,
        })
    }

    #[test]
    fn pending_lists_in_creation_order() {
        let gate = ConfirmationGate::new();
        let first = gate.stage(rename("one"), json!({})).expect("stage");
        let second = gate.stage(rename("two"), json!({})).expect("stage");

        let ids: Vec<String> = gate.pending().expect("pending").into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(first.tool, "set_dashboard_title");
        assert_eq!(first.description, "Rename dashboard to \"one\"");
    }

    #[test]
    fn proposals_resolve_exactly_once() {
        let gate = ConfirmationGate::new();
        let proposal = gate.stage(rename("once"), json!({"title": "once"})).expect("stage");

        let (taken, mutation) = gate.take(&proposal.id).expect("take");
        assert_eq!(taken, proposal);
        assert_eq!(mutation, rename("once"));

        let error = gate.take(&proposal.id).expect_err("already resolved");
        assert!(matches!(error, AppError::NotFound(_)));
        assert!(gate.pending().expect("pending").is_empty());
    }

    #[test]
    fn cancel_targeting_only_drops_matching_pool_and_id() {
        let gate = ConfirmationGate::new();
        gate.stage(edit(CustomerPool::Creditor, 1), json!({})).expect("stage");
        let other_pool = gate.stage(edit(CustomerPool::Debitor, 1), json!({})).expect("stage");
        gate.stage(
            Mutation::DeleteCustomer(DeleteCustomerArgs {
                pool: CustomerPool::Creditor,
                id: 1,
            }),
            json!({}),
        )
        .expect("stage");

        let cancelled = gate
            .cancel_targeting(CustomerTarget {
                pool: CustomerPool::Creditor,
                id: 1,
            })
            .expect("cancel");
        assert_eq!(cancelled.len(), 2);

        let remaining = gate.pending().expect("pending");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, other_pool.id);
    }
}
