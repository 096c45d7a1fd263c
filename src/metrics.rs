use crate::errors::{AppError, AppResult};
use crate::models::{AgentState, DataValue, Metric, MetricIcon, ToolReply};
use crate::mutation::Applied;
use crate::resolver::resolve_metric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const METRIC_ID_RANGE: u32 = 100_000;
const PINNED_METRICS_SET: &str = "Pinned metrics set successfully";

/// A metric as the agent describes it. `value` may arrive as a number and is stored as display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInput {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub value: DataValue,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMetricArgs {
    pub identifier: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<DataValue>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveMetricArgs {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedMetricsArgs {
    pub metrics: Vec<MetricInput>,
}

pub fn pin_metric(state: &AgentState, input: &MetricInput) -> AppResult<Applied> {
    let metrics = build_metrics(std::slice::from_ref(input), &state.pinned_metrics)?;
    let preview = serde_json::to_value(&metrics[0])?;
    let message = format!("Pinned metric \"{}\"", input.title);

    let mut next = state.clone();
    next.pinned_metrics.extend(metrics);

    Ok(Applied {
        state: next,
        reply: ToolReply::success(message),
        preview,
    })
}

pub fn update_metric(state: &AgentState, args: &UpdateMetricArgs) -> AppResult<Applied> {
    let index = resolve_metric(&state.pinned_metrics, &args.identifier)?;
    let mut metric = state.pinned_metrics[index].clone();

    if let Some(title) = args.title.as_deref().filter(|title| !title.is_empty()) {
        metric.title = title.to_string();
    }
    if let Some(value) = &args.value {
        metric.value = value.to_string();
    }
    if args.hint.is_some() {
        metric.hint = args.hint.clone();
    }
    if let Some(icon) = args.icon.as_deref() {
        metric.icon = Some(MetricIcon::coerce(icon));
    }

    let preview = serde_json::to_value(&metric)?;
    let message = format!("Updated metric \"{}\"", metric.title);
    let mut next = state.clone();
    next.pinned_metrics[index] = metric;

    Ok(Applied {
        state: next,
        reply: ToolReply::success(message),
        preview,
    })
}

pub fn remove_metric(state: &AgentState, args: &RemoveMetricArgs) -> AppResult<Applied> {
    let index = resolve_metric(&state.pinned_metrics, &args.identifier)?;
    let preview = serde_json::to_value(&state.pinned_metrics[index])?;
    let message = format!("Removed metric \"{}\"", state.pinned_metrics[index].title);

    let mut next = state.clone();
    next.pinned_metrics.remove(index);

    Ok(Applied {
        state: next,
        reply: ToolReply::success(message),
        preview,
    })
}

/// Append a batch to the pinned metrics.
pub fn add_pinned_metrics(state: &AgentState, args: &PinnedMetricsArgs) -> AppResult<Applied> {
    let metrics = build_metrics(&args.metrics, &state.pinned_metrics)?;
    let preview = serde_json::to_value(&metrics)?;

    let mut next = state.clone();
    next.pinned_metrics.extend(metrics);

    Ok(Applied {
        state: next,
        reply: ToolReply::success(PINNED_METRICS_SET),
        preview,
    })
}

/// Replace the pinned metrics with the batch.
pub fn set_pinned_metrics(state: &AgentState, args: &PinnedMetricsArgs) -> AppResult<Applied> {
    let metrics = build_metrics(&args.metrics, &[])?;
    let preview = serde_json::to_value(&metrics)?;

    let mut next = state.clone();
    next.pinned_metrics = metrics;

    Ok(Applied {
        state: next,
        reply: ToolReply::success(PINNED_METRICS_SET),
        preview,
    })
}

/// Give every id-less input a fresh random id that collides with neither `existing`
/// nor the other inputs.
pub fn fill_missing_ids(inputs: &mut [MetricInput], existing: &[Metric]) {
    let mut taken: HashSet<String> = existing
        .iter()
        .map(|metric| metric.id.clone())
        .chain(inputs.iter().filter_map(|input| input.id.clone()))
        .collect();
    let mut rng = rand::rng();

    for input in inputs.iter_mut().filter(|input| input.id.is_none()) {
        let id = loop {
            let candidate = format!("metric_{}", rng.random_range(0..METRIC_ID_RANGE));
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(id.clone());
        input.id = Some(id);
    }
}

fn build_metrics(inputs: &[MetricInput], existing: &[Metric]) -> AppResult<Vec<Metric>> {
    let mut inputs = inputs.to_vec();
    fill_missing_ids(&mut inputs, existing);

    let mut seen: HashSet<&str> = existing.iter().map(|metric| metric.id.as_str()).collect();
    let mut metrics = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let id = input.id.clone().unwrap_or_default();
        if !seen.insert(input.id.as_deref().unwrap_or_default()) {
            return Err(AppError::InvalidInput(format!("Metric id \"{}\" is already pinned", id)));
        }
        metrics.push(Metric {
            id,
            title: input.title.clone(),
            value: input.value.to_string(),
            hint: input.hint.clone(),
            icon: input.icon.as_deref().map(MetricIcon::coerce),
        });
    }
    Ok(metrics)
}
