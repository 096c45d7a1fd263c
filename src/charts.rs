//! Chart mutation engine: build chart specs from loosely-typed tool arguments
//! and apply add/update/delete against the chart collection.

use crate::errors::{AppError, AppResult};
use crate::models::{AgentState, Chart, ChartDataRecord, ChartKind, ChartSpec, DataValue, ToolReply, TreeNode};
use crate::mutation::Applied;
use crate::resolver::resolve_chart;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNTITLED: &str = "Untitled";

/// Every optional chart field a tool call may carry. Which ones matter depends on the chart type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFields {
    #[serde(rename = "type", default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub y_fields: Option<Vec<String>>,
    #[serde(default)]
    pub value_key: Option<String>,
    #[serde(default)]
    pub name_key: Option<String>,
    /// Heatmap cell field name, or a scalar chart's direct value.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub matrix: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub x_labels: Option<Vec<String>>,
    #[serde(default)]
    pub y_labels: Option<Vec<String>>,
    #[serde(default)]
    pub nodes: Option<Vec<TreeNode>>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChartArgs {
    pub current_title: String,
    #[serde(flatten)]
    pub fields: ChartFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteChartArgs {
    pub title: String,
}

pub fn add_chart(state: &AgentState, fields: &ChartFields) -> AppResult<Applied> {
    let kind = parse_kind(fields.chart_type.as_deref().unwrap_or_default())?;
    let title = non_empty(fields.title.as_deref()).unwrap_or(UNTITLED).to_string();
    let spec = build_spec(kind, title.clone(), fields, None);
    let data = fields
        .data
        .as_ref()
        .and_then(normalize_data)
        .unwrap_or_default();
    let chart = Chart { spec, data };
    let preview = serde_json::to_value(&chart)?;

    let mut next = state.clone();
    next.charts.push(chart);

    Ok(Applied {
        state: next,
        reply: ToolReply::success(format!("Added chart \"{}\" successfully!", title)),
        preview,
    })
}

pub fn update_chart(state: &AgentState, args: &UpdateChartArgs) -> AppResult<Applied> {
    let index = resolve_chart(&state.charts, &args.current_title)?;
    let existing = &state.charts[index];
    let fields = &args.fields;

    let kind = match non_empty(fields.chart_type.as_deref()) {
        Some(raw) => parse_kind(raw)?,
        None => existing.spec.kind(),
    };
    let title = non_empty(fields.title.as_deref())
        .unwrap_or_else(|| existing.title())
        .to_string();
    let spec = build_spec(kind, title.clone(), fields, Some(&existing.spec));
    let data = fields
        .data
        .as_ref()
        .and_then(normalize_data)
        .unwrap_or_else(|| existing.data.clone());
    let chart = Chart { spec, data };
    let preview = serde_json::to_value(&chart)?;

    let mut next = state.clone();
    next.charts[index] = chart;

    Ok(Applied {
        state: next,
        reply: ToolReply::success(format!("Updated chart \"{}\" successfully!", title)),
        preview,
    })
}

pub fn delete_chart(state: &AgentState, args: &DeleteChartArgs) -> AppResult<Applied> {
    let index = resolve_chart(&state.charts, &args.title)?;
    let preview = serde_json::to_value(&state.charts[index])?;

    let mut next = state.clone();
    next.charts.remove(index);

    Ok(Applied {
        state: next,
        reply: ToolReply::success(format!("Deleted chart \"{}\" successfully!", args.title)),
        preview,
    })
}

fn parse_kind(raw: &str) -> AppResult<ChartKind> {
    ChartKind::parse(raw).ok_or_else(|| {
        AppError::UnsupportedVariant(format!("Unsupported chart type \"{}\"", raw.trim()))
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Resolve each field from the explicit argument, then the existing chart's
/// same-shaped field, then the variant default.
fn build_spec(kind: ChartKind, title: String, fields: &ChartFields, existing: Option<&ChartSpec>) -> ChartSpec {
    let pick = |explicit: &Option<String>, previous: Option<&str>, default: &str| -> String {
        explicit
            .clone()
            .or_else(|| previous.map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    };
    let previous_x = existing.and_then(ChartSpec::x);
    let previous_y = existing.and_then(ChartSpec::single_y);
    let series = || {
        fields
            .y_fields
            .clone()
            .or_else(|| existing.and_then(ChartSpec::series_y).map(<[String]>::to_vec))
            .unwrap_or_default()
    };

    match kind {
        ChartKind::Line => ChartSpec::Line {
            title,
            x: pick(&fields.x, previous_x, "x"),
            y: pick(&fields.y, previous_y, "y"),
        },
        ChartKind::Bar => ChartSpec::Bar {
            title,
            x: pick(&fields.x, previous_x, "x"),
            y: pick(&fields.y, previous_y, "y"),
        },
        ChartKind::Pie => ChartSpec::Pie {
            title,
            x: pick(&fields.x, previous_x, "category"),
            y: pick(&fields.y, previous_y, "value"),
        },
        ChartKind::Scalar => ChartSpec::Scalar {
            title,
            value_key: pick(&fields.value_key, existing.and_then(ChartSpec::value_key), "value"),
            format: fields
                .format
                .clone()
                .or_else(|| existing.and_then(ChartSpec::format).map(str::to_string)),
            value: fields
                .value
                .as_ref()
                .and_then(DataValue::from_json)
                .or_else(|| existing.and_then(ChartSpec::scalar_value).cloned()),
        },
        ChartKind::Table => ChartSpec::Table {
            title,
            columns: fields
                .columns
                .clone()
                .or_else(|| existing.and_then(ChartSpec::columns).map(<[String]>::to_vec))
                .unwrap_or_default(),
        },
        ChartKind::StackedBar => ChartSpec::StackedBar {
            title,
            x: pick(&fields.x, previous_x, "x"),
            y: series(),
        },
        ChartKind::GroupedBar => ChartSpec::GroupedBar {
            title,
            x: pick(&fields.x, previous_x, "x"),
            y: series(),
        },
        ChartKind::Heatmap => ChartSpec::Heatmap {
            title,
            x: pick(&fields.x, previous_x, "x"),
            y: pick(&fields.y, previous_y, "y"),
            value: pick(
                &fields.value.as_ref().and_then(field_name),
                existing.and_then(ChartSpec::value_field),
                "value",
            ),
            matrix: fields
                .matrix
                .clone()
                .or_else(|| existing.and_then(ChartSpec::matrix).map(<[Vec<f64>]>::to_vec)),
            x_labels: fields
                .x_labels
                .clone()
                .or_else(|| existing.and_then(ChartSpec::x_labels).map(<[String]>::to_vec)),
            y_labels: fields
                .y_labels
                .clone()
                .or_else(|| existing.and_then(ChartSpec::y_labels).map(<[String]>::to_vec)),
        },
        ChartKind::Tree => ChartSpec::Tree {
            title,
            name_key: pick(&fields.name_key, existing.and_then(ChartSpec::name_key), "name"),
            value_key: pick(&fields.value_key, existing.and_then(ChartSpec::value_key), "value"),
            nodes: fields
                .nodes
                .clone()
                .or_else(|| existing.and_then(ChartSpec::nodes).map(<[TreeNode]>::to_vec)),
        },
    }
}

/// A heatmap names its cell field with a string; a number names the field
/// spelled as that number.
fn field_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Array-shaped input becomes rows of string/number cells; anything else is `None`.
pub fn normalize_data(value: &Value) -> Option<Vec<ChartDataRecord>> {
    let rows = value.as_array()?;
    Some(
        rows.iter()
            .filter_map(Value::as_object)
            .map(|row| {
                row.iter()
                    .filter_map(|(key, cell)| DataValue::from_json(cell).map(|cell| (key.clone(), cell)))
                    .collect::<ChartDataRecord>()
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::{add_chart, delete_chart, update_chart, ChartFields, DeleteChartArgs, UpdateChartArgs};
    use crate::errors::AppError;
    use crate::models::{AgentState, ChartKind, ChartSpec, DataValue};
    use serde_json::json;

    fn fields(value: serde_json::Value) -> ChartFields {
        serde_json::from_value(value).expect("chart fields")
    }

    fn update(current_title: &str, value: serde_json::Value) -> UpdateChartArgs {
        UpdateChartArgs {
            current_title: current_title.to_string(),
            fields: fields(value),
        }
    }

    fn with_chart(value: serde_json::Value) -> AgentState {
        add_chart(&AgentState::default(), &fields(value))
            .expect("add chart")
            .state
    }

    #[test]
    fn add_bar_chart_applies_defaults_and_keeps_data() {
        let applied = add_chart(
            &AgentState::default(),
            &fields(json!({"type": "bar", "title": "Revenue", "data": [{"x": "Q1", "y": 100}]})),
        )
        .expect("add chart");

        assert_eq!(applied.state.charts.len(), 1);
        assert_eq!(
            serde_json::to_value(&applied.state.charts[0]).expect("serialize"),
            json!({"type": "bar", "title": "Revenue", "x": "x", "y": "y", "data": [{"x": "Q1", "y": 100}]})
        );
        assert_eq!(applied.reply.message(), "Added chart \"Revenue\" successfully!");
    }

    #[test]
    fn add_applies_variant_defaults() {
        let cases = [
            ("pie", json!({"type": "pie", "title": "Pie", "x": "category", "y": "value", "data": []})),
            ("scalar", json!({"type": "scalar", "title": "Pie", "valueKey": "value", "data": []})),
            ("table", json!({"type": "table", "title": "Pie", "columns": [], "data": []})),
            ("stackedBar", json!({"type": "stackedBar", "title": "Pie", "x": "x", "y": [], "data": []})),
            ("groupedBar", json!({"type": "groupedBar", "title": "Pie", "x": "x", "y": [], "data": []})),
            ("heatmap", json!({"type": "heatmap", "title": "Pie", "x": "x", "y": "y", "value": "value", "data": []})),
            ("tree", json!({"type": "tree", "title": "Pie", "nameKey": "name", "valueKey": "value", "data": []})),
        ];
        for (chart_type, expected) in cases {
            let state = with_chart(json!({"type": chart_type, "title": "Pie"}));
            assert_eq!(
                serde_json::to_value(&state.charts[0]).expect("serialize"),
                expected,
                "defaults for {chart_type}"
            );
        }
    }

    #[test]
    fn unsupported_type_creates_nothing() {
        let error = add_chart(&AgentState::default(), &fields(json!({"type": "radar", "title": "Nope"})))
            .expect_err("unsupported");
        assert!(matches!(error, AppError::UnsupportedVariant(_)));
        assert!(error.to_string().starts_with("Unsupported chart type"));
    }

    #[test]
    fn non_array_data_becomes_empty() {
        let state = with_chart(json!({"type": "line", "title": "Sales", "data": {"x": 1}}));
        assert!(state.charts[0].data.is_empty());

        let state = with_chart(json!({"type": "line", "title": "Sales", "data": [{"x": "a", "y": 1, "bad": null}, 7]}));
        assert_eq!(state.charts[0].data.len(), 1);
        assert_eq!(state.charts[0].data[0].len(), 2);
    }

    #[test]
    fn identity_update_leaves_chart_unchanged() {
        let state = with_chart(json!({"type": "heatmap", "title": "Load", "x": "day", "y": "hour", "value": "hits",
            "data": [{"day": "Mon", "hour": 1, "hits": 4}]}));
        let applied = update_chart(&state, &update("Load", json!({}))).expect("update");
        assert_eq!(applied.state, state);
    }

    #[test]
    fn update_falls_back_to_existing_fields_and_data() {
        let state = with_chart(json!({"type": "line", "title": "Sales", "x": "day", "y": "total",
            "data": [{"day": "Mon", "total": 3}]}));
        let applied = update_chart(&state, &update("Sales", json!({"type": "bar", "title": "Sales v2"})))
            .expect("update");
        let chart = &applied.state.charts[0];
        assert_eq!(
            chart.spec,
            ChartSpec::Bar {
                title: "Sales v2".to_string(),
                x: "day".to_string(),
                y: "total".to_string()
            }
        );
        assert_eq!(chart.data, state.charts[0].data);
    }

    #[test]
    fn update_drops_incompatible_y_shape() {
        let state = with_chart(json!({"type": "stackedBar", "title": "Mix", "x": "month", "yFields": ["a", "b"]}));
        let applied = update_chart(&state, &update("Mix", json!({"type": "line"}))).expect("update");
        assert_eq!(applied.state.charts[0].spec.single_y(), Some("y"));
        assert_eq!(applied.state.charts[0].spec.x(), Some("month"));

        let back = update_chart(&applied.state, &update("Mix", json!({"type": "groupedBar"}))).expect("update");
        assert_eq!(back.state.charts[0].spec.series_y(), Some(&[][..]));
    }

    #[test]
    fn update_replaces_data_wholesale_and_keeps_index() {
        let mut state = with_chart(json!({"type": "line", "title": "A", "data": [{"x": 1, "y": 2}]}));
        state = add_chart(&state, &fields(json!({"type": "pie", "title": "B"}))).expect("add").state;
        state = add_chart(&state, &fields(json!({"type": "table", "title": "C"}))).expect("add").state;

        let applied = update_chart(&state, &update("B", json!({"data": [{"category": "x", "value": 9}]})))
            .expect("update");
        let titles: Vec<&str> = applied.state.charts.iter().map(|chart| chart.title()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(applied.state.charts[1].data.len(), 1);
        assert_eq!(applied.state.charts[1].data[0].get("value"), Some(&DataValue::Number(9_u64.into())));
    }

    #[test]
    fn update_to_unknown_type_fails_without_change() {
        let state = with_chart(json!({"type": "line", "title": "A"}));
        let error = update_chart(&state, &update("A", json!({"type": "sankey"}))).expect_err("unsupported");
        assert!(matches!(error, AppError::UnsupportedVariant(_)));
    }

    #[test]
    fn scalar_keeps_direct_value_and_format() {
        let state = with_chart(json!({"type": "scalar", "title": "Cash", "value": 4200, "format": "currency"}));
        let applied = update_chart(&state, &update("Cash", json!({"valueKey": "balance"}))).expect("update");
        let spec = &applied.state.charts[0].spec;
        assert_eq!(spec.kind(), ChartKind::Scalar);
        assert_eq!(spec.value_key(), Some("balance"));
        assert_eq!(spec.format(), Some("currency"));
        assert_eq!(spec.scalar_value(), Some(&DataValue::Number(4200_u64.into())));
    }

    #[test]
    fn numeric_heatmap_value_names_the_field() {
        let state = with_chart(json!({"type": "heatmap", "title": "Grid", "value": 2024,
            "data": [{"x": "Mon", "y": 1, "2024": 7}]}));
        assert_eq!(state.charts[0].spec.value_field(), Some("2024"));

        let applied = update_chart(&state, &update("Grid", json!({"value": "hits"}))).expect("update");
        assert_eq!(applied.state.charts[0].spec.value_field(), Some("hits"));
    }

    #[test]
    fn treemap_alias_builds_tree_with_nodes() {
        let state = with_chart(json!({"type": "treemap", "title": "Spend",
            "nodes": [{"name": "Ops", "children": [{"name": "Rent", "value": 500.0}]}]}));
        let spec = &state.charts[0].spec;
        assert_eq!(spec.kind(), ChartKind::Tree);
        assert_eq!(spec.nodes().map(|nodes| nodes.len()), Some(1));
    }

    #[test]
    fn delete_then_update_reports_not_found() {
        let state = with_chart(json!({"type": "line", "title": "Gone"}));
        let deleted = delete_chart(&state, &DeleteChartArgs { title: "Gone".to_string() }).expect("delete");
        assert!(deleted.state.charts.is_empty());
        assert_eq!(deleted.reply.message(), "Deleted chart \"Gone\" successfully!");

        let error = update_chart(&deleted.state, &update("Gone", json!({"title": "Back"}))).expect_err("missing");
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[test]
    fn delete_removes_only_first_duplicate() {
        let mut state = with_chart(json!({"type": "line", "title": "Dup", "x": "first"}));
        state = add_chart(&state, &fields(json!({"type": "line", "title": "Dup", "x": "second"})))
            .expect("add")
            .state;
        let applied = delete_chart(&state, &DeleteChartArgs { title: "Dup".to_string() }).expect("delete");
        assert_eq!(applied.state.charts.len(), 1);
        assert_eq!(applied.state.charts[0].spec.x(), Some("second"));
    }
}
