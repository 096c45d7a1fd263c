use crate::cashflow::cashflow_summary;
use crate::errors::{AppError, AppResult};
use crate::gate::{ConfirmationGate, StagedProposal};
use crate::models::{AgentState, ToolReply};
use crate::mutation::Mutation;
use crate::seed::initial_state;
use crate::settings::DashboardSettings;
use crate::store::StateStore;
use crate::tools::{parse_tool_call, tool_definitions, Query, ToolCall, ToolDefinition};
use serde::Serialize;
use serde_json::Value;

/// What happened to one tool call or proposal resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CallOutcome {
    Committed { reply: ToolReply, preview: Value },
    Read { reply: ToolReply },
    Failed { code: &'static str, reply: ToolReply },
    Declined { reply: ToolReply },
    Staged { proposal: StagedProposal },
}

impl CallOutcome {
    /// The reply handed back to the agent. Staged calls have none yet.
    pub fn reply(&self) -> Option<&ToolReply> {
        match self {
            Self::Committed { reply, .. }
            | Self::Read { reply }
            | Self::Failed { reply, .. }
            | Self::Declined { reply } => Some(reply),
            Self::Staged { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct DashboardCore {
    store: StateStore,
    gate: ConfirmationGate,
    settings: DashboardSettings,
}

impl DashboardCore {
    pub fn new(settings: DashboardSettings) -> Self {
        let state = initial_state(&settings);
        Self::with_state(settings, state)
    }

    pub fn with_state(settings: DashboardSettings, state: AgentState) -> Self {
        tracing::info!(
            title = %state.title,
            charts = state.charts.len(),
            entries = state.cashflow_entries.len(),
            "dashboard session started"
        );
        Self {
            store: StateStore::new(state),
            gate: ConfirmationGate::new(),
            settings,
        }
    }

    pub fn state(&self) -> AppResult<AgentState> {
        self.store.read()
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn tools(&self) -> &'static [ToolDefinition] {
        tool_definitions()
    }

    pub fn pending(&self) -> AppResult<Vec<StagedProposal>> {
        self.gate.pending()
    }

    /// Run one tool call. `confirm` overrides the configured confirmation
    /// mode; `None` defers to `confirmTools`. Never fails: errors become a
    /// `Failed` outcome carrying a plain-string reply.
    pub fn handle_tool_call(&self, name: &str, arguments: Value, confirm: Option<bool>) -> CallOutcome {
        match self.dispatch(name, arguments, confirm) {
            Ok(outcome) => outcome,
            Err(error) => failed(name, error),
        }
    }

    pub fn accept(&self, proposal_id: &str) -> CallOutcome {
        let resolved = self.gate.take(proposal_id).and_then(|(proposal, mutation)| {
            tracing::info!(proposal_id = %proposal.id, tool = %proposal.tool, "proposal accepted");
            self.commit(&mutation)
        });
        match resolved {
            Ok(outcome) => outcome,
            Err(error) => failed("accept", error),
        }
    }

    pub fn decline(&self, proposal_id: &str) -> CallOutcome {
        match self.gate.take(proposal_id) {
            Ok((proposal, _)) => {
                tracing::info!(proposal_id = %proposal.id, tool = %proposal.tool, "proposal declined");
                CallOutcome::Declined {
                    reply: ToolReply::declined(format!(
                        "The user declined the proposed change: {}",
                        proposal.description
                    )),
                }
            }
            Err(error) => failed("decline", error),
        }
    }

    fn dispatch(&self, name: &str, arguments: Value, confirm: Option<bool>) -> AppResult<CallOutcome> {
        let mutation = match parse_tool_call(name, arguments)? {
            ToolCall::Query(query) => return self.query(query),
            ToolCall::Mutate(mutation) => mutation,
        };

        let stage = confirm.unwrap_or_else(|| self.settings.requires_confirmation(name));
        if stage {
            self.stage(mutation)
        } else {
            let mut mutation = mutation;
            mutation.assign_ids(&self.store.read()?);
            self.commit(&mutation)
        }
    }

    fn query(&self, query: Query) -> AppResult<CallOutcome> {
        let state = self.store.read()?;
        let reply = match query {
            Query::CashflowSummary => cashflow_summary(&state),
            Query::DashboardState => ToolReply::text(serde_json::to_string(&state)?),
        };
        Ok(CallOutcome::Read { reply })
    }

    /// Compute the candidate against the current snapshot and park it. Nothing is written.
    fn stage(&self, mut mutation: Mutation) -> AppResult<CallOutcome> {
        let snapshot = self.store.read()?;
        mutation.assign_ids(&snapshot);
        let applied = mutation.apply(&snapshot)?;
        let proposal = self.gate.stage(mutation, applied.preview)?;
        tracing::info!(proposal_id = %proposal.id, tool = %proposal.tool, "proposal staged");
        Ok(CallOutcome::Staged { proposal })
    }

    /// Apply against the latest state at commit time.
    fn commit(&self, mutation: &Mutation) -> AppResult<CallOutcome> {
        let (reply, preview) = self.store.update(|current| {
            let applied = mutation.apply(current)?;
            Ok((applied.state, (applied.reply, applied.preview)))
        })?;
        tracing::info!(tool = mutation.tool_name(), "tool call committed");

        if let (Mutation::DeleteCustomer(_), Some(target)) = (mutation, mutation.customer_target()) {
            for cancelled in self.gate.cancel_targeting(target)? {
                tracing::info!(
                    proposal_id = %cancelled.id,
                    pool = target.pool.as_str(),
                    id = target.id,
                    "cancelled proposal for deleted customer"
                );
            }
        }

        Ok(CallOutcome::Committed { reply, preview })
    }
}

fn failed(tool: &str, error: AppError) -> CallOutcome {
    match &error {
        AppError::Internal(_) | AppError::Io(_) => {
            tracing::error!(tool = %tool, code = error.code(), error = %error, "tool call failed")
        }
        _ => tracing::warn!(tool = %tool, code = error.code(), error = %error, "tool call failed"),
    }
    CallOutcome::Failed {
        code: error.code(),
        reply: ToolReply::text(error.to_string()),
    }
}
