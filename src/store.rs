use crate::errors::{AppError, AppResult};
use crate::models::AgentState;
use std::sync::{Arc, RwLock};

/// Sole owner of the dashboard state. Writers hand in a function of the
/// latest state; cached cashflow totals are recomputed on every write.
#[derive(Clone, Default)]
pub struct StateStore {
    state: Arc<RwLock<AgentState>>,
}

impl StateStore {
    pub fn new(initial: AgentState) -> Self {
        let mut initial = initial;
        initial.refresh_totals();
        Self {
            state: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn read(&self) -> AppResult<AgentState> {
        let state = self
            .state
            .read()
            .map_err(|_| AppError::Internal("state lock poisoned".to_string()))?;
        Ok(state.clone())
    }

    pub fn replace(&self, next: AgentState) -> AppResult<()> {
        self.update(|_| Ok((next, ())))
    }

    /// Run `updater` against the current state under the write lock. Nothing is
    /// written when it fails.
    pub fn update<F, R>(&self, updater: F) -> AppResult<R>
    where
        F: FnOnce(&AgentState) -> AppResult<(AgentState, R)>,
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| AppError::Internal("state lock poisoned".to_string()))?;
        let (mut next, result) = updater(&state)?;
        next.refresh_totals();
        *state = next;
        Ok(result)
    }
}
