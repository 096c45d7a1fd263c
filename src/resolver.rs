//! Identity resolution: map a loose identifier onto at most one entity index.
//!
//! Every lookup scans in sequence order and the first match wins, so the same
//! collection and identifier always resolve to the same entity.

use crate::errors::{AppError, AppResult};
use crate::models::{CashflowEntry, Chart, Customer, CustomerPool, Metric};

/// Charts are matched by exact title.
pub fn resolve_chart(charts: &[Chart], title: &str) -> AppResult<usize> {
    charts
        .iter()
        .position(|chart| chart.title() == title)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Chart with title \"{}\" not found. Available charts: {}",
                title,
                chart_titles(charts).join(", ")
            ))
        })
}

pub fn chart_titles(charts: &[Chart]) -> Vec<&str> {
    charts.iter().map(Chart::title).collect()
}

/// Cashflow entries are matched by the exact decimal text of their id first,
/// then by case-insensitive substring of the name. A blank identifier never matches.
pub fn resolve_cashflow_entry(entries: &[CashflowEntry], identifier: &str) -> AppResult<usize> {
    let needle = identifier.trim();
    let by_id = entries.iter().position(|entry| entry.id.to_string() == needle);
    let found = by_id.or_else(|| {
        if needle.is_empty() {
            return None;
        }
        let needle = needle.to_lowercase();
        entries
            .iter()
            .position(|entry| entry.name.to_lowercase().contains(&needle))
    });

    found.ok_or_else(|| {
        AppError::NotFound(format!(
            "Cashflow entry with identifier \"{}\" not found. Available entries: {}",
            identifier,
            entries
                .iter()
                .map(|entry| format!("{}: {}", entry.id, entry.name))
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

/// Customers are matched by id within one pool only.
pub fn resolve_customer(customers: &[Customer], pool: CustomerPool, id: i64) -> AppResult<usize> {
    customers
        .iter()
        .position(|customer| customer.id == id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No {} with id {} found. Available {}s: {}",
                pool.as_str(),
                id,
                pool.as_str(),
                customers
                    .iter()
                    .map(|customer| format!("{}: {}", customer.id, customer.business_name))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

/// Metrics are matched by exact id, then by case-insensitive title.
pub fn resolve_metric(metrics: &[Metric], identifier: &str) -> AppResult<usize> {
    let needle = identifier.trim();
    metrics
        .iter()
        .position(|metric| metric.id == needle)
        .or_else(|| {
            metrics
                .iter()
                .position(|metric| !needle.is_empty() && metric.title.eq_ignore_ascii_case(needle))
        })
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Metric \"{}\" not found. Available metrics: {}",
                identifier,
                metrics
                    .iter()
                    .map(|metric| format!("{}: {}", metric.id, metric.title))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}
