//! Tool catalogue offered to the agent, and the parser that turns a named
//! argument bag into a [`Mutation`] or a read-only query.

use crate::errors::{AppError, AppResult};
use crate::mutation::Mutation;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
    pub mutates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    CashflowSummary,
    DashboardState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Mutate(Mutation),
    Query(Query),
}

static TOOL_DEFINITIONS: Lazy<Vec<ToolDefinition>> = Lazy::new(build_definitions);

static VALIDATORS: Lazy<HashMap<&'static str, Result<jsonschema::JSONSchema, String>>> = Lazy::new(|| {
    TOOL_DEFINITIONS
        .iter()
        .map(|tool| {
            let compiled = jsonschema::JSONSchema::compile(&tool.parameters).map_err(|error| error.to_string());
            (tool.name, compiled)
        })
        .collect()
});

pub fn tool_definitions() -> &'static [ToolDefinition] {
    &TOOL_DEFINITIONS
}

pub fn find_tool(name: &str) -> Option<&'static ToolDefinition> {
    TOOL_DEFINITIONS.iter().find(|tool| tool.name == name)
}

/// Validate `arguments` against the tool's schema and parse them.
pub fn parse_tool_call(name: &str, arguments: Value) -> AppResult<ToolCall> {
    let tool = find_tool(name).ok_or_else(|| AppError::InvalidInput(format!("Unknown tool \"{}\"", name)))?;
    let mut arguments = if arguments.is_null() { json!({}) } else { arguments };
    drop_null_members(&mut arguments);
    validate_arguments(tool, &arguments)?;

    let call = match tool.name {
        "add_chart" => ToolCall::Mutate(Mutation::AddChart(parse_args(tool, arguments)?)),
        "update_chart" => ToolCall::Mutate(Mutation::UpdateChart(parse_args(tool, arguments)?)),
        "delete_chart" => ToolCall::Mutate(Mutation::DeleteChart(parse_args(tool, arguments)?)),
        "add_cashflow_entry" => ToolCall::Mutate(Mutation::AddCashflowEntry(parse_args(tool, arguments)?)),
        "remove_cashflow_entry" => ToolCall::Mutate(Mutation::RemoveCashflowEntry(parse_args(tool, arguments)?)),
        "update_cashflow_entry" => ToolCall::Mutate(Mutation::UpdateCashflowEntry(parse_args(tool, arguments)?)),
        "set_starting_balance" => ToolCall::Mutate(Mutation::SetStartingBalance(parse_args(tool, arguments)?)),
        "get_cashflow_summary" => ToolCall::Query(Query::CashflowSummary),
        "get_dashboard_state" => ToolCall::Query(Query::DashboardState),
        "pin_metric" => ToolCall::Mutate(Mutation::PinMetric(parse_args(tool, arguments)?)),
        "update_metric" => ToolCall::Mutate(Mutation::UpdateMetric(parse_args(tool, arguments)?)),
        "remove_metric" => ToolCall::Mutate(Mutation::RemoveMetric(parse_args(tool, arguments)?)),
        "add_pinned_metrics" => ToolCall::Mutate(Mutation::AddPinnedMetrics(parse_args(tool, arguments)?)),
        "update_pinned_metrics" => ToolCall::Mutate(Mutation::SetPinnedMetrics(parse_args(tool, arguments)?)),
        "set_dashboard_title" => ToolCall::Mutate(Mutation::SetDashboardTitle(parse_args(tool, arguments)?)),
        "add_customer" => ToolCall::Mutate(Mutation::AddCustomer(parse_args(tool, arguments)?)),
        "update_customer" => ToolCall::Mutate(Mutation::UpdateCustomer(parse_args(tool, arguments)?)),
        "delete_customer" => ToolCall::Mutate(Mutation::DeleteCustomer(parse_args(tool, arguments)?)),
        other => return Err(AppError::Internal(format!("tool {} has no parser", other))),
    };
    Ok(call)
}

/// An explicit `null` means the same as an absent optional, at the top level
/// and inside each metric of the batch metric tools.
fn drop_null_members(arguments: &mut Value) {
    let Value::Object(members) = arguments else {
        return;
    };
    members.retain(|_, value| !value.is_null());
    if let Some(Value::Array(metrics)) = members.get_mut("metrics") {
        for metric in metrics.iter_mut() {
            if let Value::Object(fields) = metric {
                fields.retain(|_, value| !value.is_null());
            }
        }
    }
}

fn validate_arguments(tool: &ToolDefinition, arguments: &Value) -> AppResult<()> {
    let compiled = match VALIDATORS.get(tool.name) {
        Some(Ok(compiled)) => compiled,
        Some(Err(error)) => {
            return Err(AppError::Internal(format!("invalid schema for {}: {}", tool.name, error)));
        }
        None => return Err(AppError::Internal(format!("no schema for {}", tool.name))),
    };

    let errors: Vec<String> = compiled
        .validate(arguments)
        .err()
        .map(|errors| {
            errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Invalid arguments for {}: {}",
            tool.name,
            errors.join("; ")
        )))
    }
}

fn parse_args<T: DeserializeOwned>(tool: &ToolDefinition, arguments: Value) -> AppResult<T> {
    serde_json::from_value(arguments)
        .map_err(|error| AppError::InvalidInput(format!("Invalid arguments for {}: {}", tool.name, error)))
}

// ─── Schemas ────────────────────────────────────────────────────────────────

fn string_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn chart_properties() -> serde_json::Map<String, Value> {
    let properties = json!({
        "type": {
            "type": "string",
            "description": "line, bar, pie, scalar, table, stackedBar, groupedBar, heatmap or tree (alias treemap)"
        },
        "title": { "type": "string", "description": "Chart title, also used to find the chart later" },
        "x": { "type": "string", "description": "Field for the x axis or category" },
        "y": { "type": "string", "description": "Field for the y axis or value" },
        "yFields": { "type": "array", "items": { "type": "string" }, "description": "Series fields for stackedBar and groupedBar" },
        "valueKey": { "type": "string" },
        "nameKey": { "type": "string" },
        "value": {
            "type": ["string", "number"],
            "description": "Heatmap value field (a number names the field by its decimal text), or a scalar chart's value"
        },
        "columns": string_list(),
        "format": { "type": "string" },
        "matrix": { "type": "array", "items": { "type": "array", "items": { "type": "number" } } },
        "xLabels": string_list(),
        "yLabels": string_list(),
        "nodes": { "type": "array", "items": { "$ref": "#/definitions/treeNode" } },
        "data": { "description": "Array of rows; anything else is treated as empty" }
    });
    match properties {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn chart_schema(extra: Value, required: &[&str]) -> Value {
    let mut properties = chart_properties();
    if let Value::Object(extra) = extra {
        properties.extend(extra);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "definitions": {
            "treeNode": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "value": { "type": "number" },
                    "children": { "type": "array", "items": { "$ref": "#/definitions/treeNode" } }
                },
                "required": ["name"]
            }
        }
    })
}

fn metric_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "title": { "type": "string" },
            "value": { "type": ["string", "number"] },
            "hint": { "type": "string" },
            "icon": { "type": "string", "description": "users, mrr, conversion, churn or custom" }
        },
        "required": ["title", "value"]
    })
}

fn pool_schema() -> Value {
    json!({ "type": "string", "enum": ["creditor", "debitor", "creditors", "debitors"] })
}

fn build_definitions() -> Vec<ToolDefinition> {
    let identifier = json!({ "type": ["string", "integer"], "description": "Exact entry id, or part of its name" });

    vec![
        ToolDefinition {
            name: "add_chart",
            description: "Add a chart to the dashboard",
            parameters: chart_schema(json!({}), &["type", "title"]),
            mutates: true,
        },
        ToolDefinition {
            name: "update_chart",
            description: "Update the chart with the given current title",
            parameters: chart_schema(json!({ "currentTitle": { "type": "string" } }), &["currentTitle"]),
            mutates: true,
        },
        ToolDefinition {
            name: "delete_chart",
            description: "Delete the chart with the given title",
            parameters: json!({
                "type": "object",
                "properties": { "title": { "type": "string" } },
                "required": ["title"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "add_cashflow_entry",
            description: "Add an incoming or outgoing payment to the cashflow ledger",
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "amount": { "type": "number" },
                    "dateDue": { "type": "string", "description": "YYYY-MM-DD" },
                    "type": { "type": "string", "description": "in or out" },
                    "customerId": { "type": "integer" }
                },
                "required": ["name", "amount", "dateDue", "type"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "remove_cashflow_entry",
            description: "Remove a cashflow entry by id or name",
            parameters: json!({
                "type": "object",
                "properties": { "identifier": identifier },
                "required": ["identifier"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "update_cashflow_entry",
            description: "Update fields of a cashflow entry found by id or name",
            parameters: json!({
                "type": "object",
                "properties": {
                    "identifier": identifier,
                    "name": { "type": "string" },
                    "amount": { "type": "number" },
                    "dateDue": { "type": "string" },
                    "type": { "type": "string" },
                    "customerId": { "type": "integer" }
                },
                "required": ["identifier"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "set_starting_balance",
            description: "Set the balance the cashflow projection starts from",
            parameters: json!({
                "type": "object",
                "properties": { "amount": { "type": "number" } },
                "required": ["amount"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "get_cashflow_summary",
            description: "Summarize inflow, outflow and recent cashflow entries",
            parameters: json!({ "type": "object", "properties": {} }),
            mutates: false,
        },
        ToolDefinition {
            name: "get_dashboard_state",
            description: "Return the full dashboard state",
            parameters: json!({ "type": "object", "properties": {} }),
            mutates: false,
        },
        ToolDefinition {
            name: "pin_metric",
            description: "Pin a metric card to the dashboard",
            parameters: metric_schema(),
            mutates: true,
        },
        ToolDefinition {
            name: "update_metric",
            description: "Update a pinned metric found by id or title",
            parameters: json!({
                "type": "object",
                "properties": {
                    "identifier": { "type": "string" },
                    "title": { "type": "string" },
                    "value": { "type": ["string", "number"] },
                    "hint": { "type": "string" },
                    "icon": { "type": "string" }
                },
                "required": ["identifier"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "remove_metric",
            description: "Unpin a metric found by id or title",
            parameters: json!({
                "type": "object",
                "properties": { "identifier": { "type": "string" } },
                "required": ["identifier"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "add_pinned_metrics",
            description: "Pin several metrics at once",
            parameters: json!({
                "type": "object",
                "properties": { "metrics": { "type": "array", "items": metric_schema() } },
                "required": ["metrics"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "update_pinned_metrics",
            description: "Replace all pinned metrics",
            parameters: json!({
                "type": "object",
                "properties": { "metrics": { "type": "array", "items": metric_schema() } },
                "required": ["metrics"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "set_dashboard_title",
            description: "Rename the dashboard",
            parameters: json!({
                "type": "object",
                "properties": { "title": { "type": "string" } },
                "required": ["title"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "add_customer",
            description: "Add a creditor or debitor",
            parameters: json!({
                "type": "object",
                "properties": {
                    "pool": pool_schema(),
                    "businessName": { "type": "string" },
                    "phoneNumber": { "type": "string" },
                    "emailAddress": { "type": "string" },
                    "links": { "type": "string" }
                },
                "required": ["pool", "businessName"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "update_customer",
            description: "Edit a creditor or debitor by pool and id",
            parameters: json!({
                "type": "object",
                "properties": {
                    "pool": pool_schema(),
                    "id": { "type": "integer" },
                    "businessName": { "type": "string" },
                    "phoneNumber": { "type": "string" },
                    "emailAddress": { "type": "string" },
                    "links": { "type": "string" }
                },
                "required": ["pool", "id"]
            }),
            mutates: true,
        },
        ToolDefinition {
            name: "delete_customer",
            description: "Delete a creditor or debitor by pool and id",
            parameters: json!({
                "type": "object",
                "properties": {
                    "pool": pool_schema(),
                    "id": { "type": "integer" }
                },
                "required": ["pool", "id"]
            }),
            mutates: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::{find_tool, parse_tool_call, tool_definitions, Query, ToolCall, VALIDATORS};
    use crate::cashflow::EntryIdentifier;
    use crate::errors::AppError;
    use crate::mutation::Mutation;
    use serde_json::{json, Value};

    #[test]
    fn every_schema_compiles_and_names_are_unique() {
        let mut names = std::collections::HashSet::new();
        for tool in tool_definitions() {
            assert!(names.insert(tool.name), "duplicate tool {}", tool.name);
            assert!(
                matches!(VALIDATORS.get(tool.name), Some(Ok(_))),
                "schema for {} compiles",
                tool.name
            );
        }
        assert_eq!(names.len(), 18);
        assert_eq!(VALIDATORS.len(), 18);
    }

    #[test]
    fn every_tool_has_a_parser() {
        for tool in tool_definitions() {
            let error = parse_tool_call(tool.name, json!({})).err();
            assert!(!matches!(error, Some(AppError::Internal(_))), "{} has no parser", tool.name);
        }
    }

    #[test]
    fn add_chart_accepts_missing_optionals_and_any_data() {
        let call = parse_tool_call("add_chart", json!({"type": "radar", "title": "X", "data": "not rows"}))
            .expect("parse");
        let ToolCall::Mutate(Mutation::AddChart(fields)) = call else {
            panic!("expected add_chart mutation");
        };
        assert_eq!(fields.chart_type.as_deref(), Some("radar"));
        assert_eq!(fields.data, Some(Value::String("not rows".to_string())));
    }

    #[test]
    fn schema_violations_are_invalid_input() {
        let error = parse_tool_call("add_cashflow_entry", json!({"name": "Rent", "amount": "lots"}))
            .expect_err("invalid");
        assert!(matches!(error, AppError::InvalidInput(_)));
        assert!(error.to_string().starts_with("Invalid arguments for add_cashflow_entry"));
    }

    #[test]
    fn unknown_tool_is_invalid_input() {
        let error = parse_tool_call("drop_tables", Value::Null).expect_err("unknown");
        assert_eq!(error.to_string(), "Unknown tool \"drop_tables\"");
    }

    #[test]
    fn identifiers_accept_numbers_and_names() {
        let by_id = parse_tool_call("remove_cashflow_entry", json!({"identifier": 3})).expect("parse");
        assert_eq!(
            by_id,
            ToolCall::Mutate(Mutation::RemoveCashflowEntry(crate::cashflow::RemoveCashflowArgs {
                identifier: EntryIdentifier::Id(3)
            }))
        );
        let by_name = parse_tool_call("remove_cashflow_entry", json!({"identifier": "rent"})).expect("parse");
        assert!(matches!(by_name, ToolCall::Mutate(Mutation::RemoveCashflowEntry(_))));
    }

    #[test]
    fn null_optionals_read_as_absent() {
        let call = parse_tool_call("add_chart", json!({"type": "bar", "title": "R", "x": null, "yFields": null}))
            .expect("parse");
        let ToolCall::Mutate(Mutation::AddChart(fields)) = call else {
            panic!("expected add_chart mutation");
        };
        assert_eq!(fields.x, None);
        assert_eq!(fields.y_fields, None);

        let batch = parse_tool_call(
            "add_pinned_metrics",
            json!({"metrics": [{"title": "Runway", "value": 14, "hint": null, "icon": null}]}),
        );
        assert!(batch.is_ok(), "{batch:?}");

        let error = parse_tool_call("delete_chart", json!({"title": null})).expect_err("required");
        assert!(matches!(error, AppError::InvalidInput(_)));
    }

    #[test]
    fn integral_float_identifier_is_an_id() {
        let call = parse_tool_call("remove_cashflow_entry", json!({"identifier": 2.0})).expect("parse");
        assert_eq!(
            call,
            ToolCall::Mutate(Mutation::RemoveCashflowEntry(crate::cashflow::RemoveCashflowArgs {
                identifier: EntryIdentifier::Id(2)
            }))
        );
    }

    #[test]
    fn read_tools_parse_to_queries() {
        assert_eq!(
            parse_tool_call("get_cashflow_summary", Value::Null).expect("parse"),
            ToolCall::Query(Query::CashflowSummary)
        );
        assert!(!find_tool("get_dashboard_state").expect("tool").mutates);
    }
}
