//! The single proposed-delta type every tool call is turned into. Whether a
//! mutation is committed immediately or staged first is the caller's choice.

use crate::cashflow::{
    self, AddCashflowArgs, RemoveCashflowArgs, StartingBalanceArgs, UpdateCashflowArgs,
};
use crate::charts::{self, ChartFields, DeleteChartArgs, UpdateChartArgs};
use crate::customers::{self, AddCustomerArgs, DeleteCustomerArgs, UpdateCustomerArgs};
use crate::errors::{AppError, AppResult};
use crate::metrics::{self, MetricInput, PinnedMetricsArgs, RemoveMetricArgs, UpdateMetricArgs};
use crate::models::{AgentState, CustomerPool, ToolReply};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Candidate next state plus what to tell the agent and show the user.
#[derive(Debug, Clone)]
pub struct Applied {
    pub state: AgentState,
    pub reply: ToolReply,
    pub preview: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleArgs {
    pub title: String,
}

/// The customer a mutation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CustomerTarget {
    pub pool: CustomerPool,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddChart(ChartFields),
    UpdateChart(UpdateChartArgs),
    DeleteChart(DeleteChartArgs),
    AddCashflowEntry(AddCashflowArgs),
    RemoveCashflowEntry(RemoveCashflowArgs),
    UpdateCashflowEntry(UpdateCashflowArgs),
    SetStartingBalance(StartingBalanceArgs),
    PinMetric(MetricInput),
    UpdateMetric(UpdateMetricArgs),
    RemoveMetric(RemoveMetricArgs),
    AddPinnedMetrics(PinnedMetricsArgs),
    SetPinnedMetrics(PinnedMetricsArgs),
    SetDashboardTitle(TitleArgs),
    AddCustomer(AddCustomerArgs),
    UpdateCustomer(UpdateCustomerArgs),
    DeleteCustomer(DeleteCustomerArgs),
}

impl Mutation {
    /// Compute the candidate next state from `state`. Pure: `state` is never touched.
    pub fn apply(&self, state: &AgentState) -> AppResult<Applied> {
        match self {
            Self::AddChart(args) => charts::add_chart(state, args),
            Self::UpdateChart(args) => charts::update_chart(state, args),
            Self::DeleteChart(args) => charts::delete_chart(state, args),
            Self::AddCashflowEntry(args) => cashflow::add_cashflow_entry(state, args),
            Self::RemoveCashflowEntry(args) => cashflow::remove_cashflow_entry(state, args),
            Self::UpdateCashflowEntry(args) => cashflow::update_cashflow_entry(state, args),
            Self::SetStartingBalance(args) => cashflow::set_starting_balance(state, args),
            Self::PinMetric(args) => metrics::pin_metric(state, args),
            Self::UpdateMetric(args) => metrics::update_metric(state, args),
            Self::RemoveMetric(args) => metrics::remove_metric(state, args),
            Self::AddPinnedMetrics(args) => metrics::add_pinned_metrics(state, args),
            Self::SetPinnedMetrics(args) => metrics::set_pinned_metrics(state, args),
            Self::SetDashboardTitle(args) => set_dashboard_title(state, args),
            Self::AddCustomer(args) => customers::add_customer(state, args),
            Self::UpdateCustomer(args) => customers::update_customer(state, args),
            Self::DeleteCustomer(args) => customers::delete_customer(state, args),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::AddChart(_) => "add_chart",
            Self::UpdateChart(_) => "update_chart",
            Self::DeleteChart(_) => "delete_chart",
            Self::AddCashflowEntry(_) => "add_cashflow_entry",
            Self::RemoveCashflowEntry(_) => "remove_cashflow_entry",
            Self::UpdateCashflowEntry(_) => "update_cashflow_entry",
            Self::SetStartingBalance(_) => "set_starting_balance",
            Self::PinMetric(_) => "pin_metric",
            Self::UpdateMetric(_) => "update_metric",
            Self::RemoveMetric(_) => "remove_metric",
            Self::AddPinnedMetrics(_) => "add_pinned_metrics",
            Self::SetPinnedMetrics(_) => "update_pinned_metrics",
            Self::SetDashboardTitle(_) => "set_dashboard_title",
            Self::AddCustomer(_) => "add_customer",
            Self::UpdateCustomer(_) => "update_customer",
            Self::DeleteCustomer(_) => "delete_customer",
        }
    }

    /// One-line description shown next to the accept/decline affordance.
    pub fn describe(&self) -> String {
        match self {
            Self::AddChart(args) => format!(
                "Add {} chart \"{}\"",
                args.chart_type.as_deref().unwrap_or("unknown"),
                args.title.as_deref().unwrap_or("Untitled")
            ),
            Self::UpdateChart(args) => format!("Update chart \"{}\"", args.current_title),
            Self::DeleteChart(args) => format!("Delete chart \"{}\"", args.title),
            Self::AddCashflowEntry(args) => format!(
                "Add cashflow entry \"{}\" ({} {} due {})",
                args.name,
                args.flow,
                args.amount.abs(),
                args.date_due
            ),
            Self::RemoveCashflowEntry(args) => {
                format!("Remove cashflow entry \"{}\"", args.identifier.as_lookup())
            }
            Self::UpdateCashflowEntry(args) => {
                format!("Update cashflow entry \"{}\"", args.identifier.as_lookup())
            }
            Self::SetStartingBalance(args) => format!("Set starting balance to {:.2}", args.amount),
            Self::PinMetric(args) => format!("Pin metric \"{}\" = {}", args.title, args.value),
            Self::UpdateMetric(args) => format!("Update metric \"{}\"", args.identifier),
            Self::RemoveMetric(args) => format!("Remove metric \"{}\"", args.identifier),
            Self::AddPinnedMetrics(args) => format!("Pin {} metrics", args.metrics.len()),
            Self::SetPinnedMetrics(args) => format!("Replace pinned metrics with {} metrics", args.metrics.len()),
            Self::SetDashboardTitle(args) => format!("Rename dashboard to \"{}\"", args.title),
            Self::AddCustomer(args) => format!("Add {} \"{}\"", args.pool.as_str(), args.business_name),
            Self::UpdateCustomer(args) => format!("Update {} {}", args.pool.as_str(), args.id),
            Self::DeleteCustomer(args) => format!("Delete {} {}", args.pool.as_str(), args.id),
        }
    }

    pub fn customer_target(&self) -> Option<CustomerTarget> {
        match self {
            Self::UpdateCustomer(args) => Some(CustomerTarget {
                pool: args.pool,
                id: args.id,
            }),
            Self::DeleteCustomer(args) => Some(CustomerTarget {
                pool: args.pool,
                id: args.id,
            }),
            _ => None,
        }
    }

    /// Fix randomly drawn ids before staging, so the preview and the commit agree.
    pub fn assign_ids(&mut self, state: &AgentState) {
        match self {
            Self::PinMetric(input) => metrics::fill_missing_ids(std::slice::from_mut(input), &state.pinned_metrics),
            Self::AddPinnedMetrics(args) => metrics::fill_missing_ids(&mut args.metrics, &state.pinned_metrics),
            Self::SetPinnedMetrics(args) => metrics::fill_missing_ids(&mut args.metrics, &[]),
            _ => {}
        }
    }
}

fn set_dashboard_title(state: &AgentState, args: &TitleArgs) -> AppResult<Applied> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Dashboard title must not be empty".to_string()));
    }
    let mut next = state.clone();
    next.title = title.to_string();

    Ok(Applied {
        state: next,
        reply: ToolReply::success(format!("Dashboard title set to \"{}\"", title)),
        preview: serde_json::json!({ "title": title }),
    })
}
