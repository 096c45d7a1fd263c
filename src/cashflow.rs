use crate::errors::{AppError, AppResult};
use crate::models::{AgentState, CashflowEntry, CashflowTotals, FlowType, ToolReply};
use crate::mutation::Applied;
use crate::resolver::resolve_cashflow_entry;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const RECENT_ENTRY_COUNT: usize = 3;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A numeric id or a name fragment. Agents send either.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryIdentifier {
    Id(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for EntryIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        match Value::deserialize(deserializer)? {
            Value::String(name) => Ok(Self::Name(name)),
            Value::Number(number) => number
                .as_i64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64)
                        .map(|value| value as i64)
                })
                .map(Self::Id)
                .ok_or_else(|| D::Error::custom(format!("identifier {} is not a whole number", number))),
            other => Err(D::Error::custom(format!(
                "identifier must be an entry id or a name, got {}",
                other
            ))),
        }
    }
}

impl EntryIdentifier {
    pub fn as_lookup(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Name(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCashflowArgs {
    pub name: String,
    pub amount: f64,
    pub date_due: String,
    #[serde(rename = "type")]
    pub flow: String,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveCashflowArgs {
    pub identifier: EntryIdentifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCashflowArgs {
    pub identifier: EntryIdentifier,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date_due: Option<String>,
    #[serde(rename = "type", default)]
    pub flow: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingBalanceArgs {
    pub amount: f64,
}

pub fn add_cashflow_entry(state: &AgentState, args: &AddCashflowArgs) -> AppResult<Applied> {
    let flow = parse_flow(&args.flow)?;
    let amount = magnitude(args.amount)?;
    let date_due = parse_date(&args.date_due)?;

    let mut next = state.clone();
    let id = next_entry_id(&next);
    next.id_watermarks.cashflow = id;
    let entry = CashflowEntry {
        id,
        name: args.name.clone(),
        amount,
        date_due,
        flow,
        customer_id: args.customer_id,
    };
    let preview = serde_json::to_value(&entry)?;
    let message = format!(
        "Successfully added cashflow entry: {} for {}${} due {}",
        entry.name,
        flow.sign(),
        entry.amount,
        entry.date_due
    );
    next.cashflow_entries.push(entry);

    Ok(Applied {
        state: next,
        reply: ToolReply::text(message),
        preview,
    })
}

pub fn remove_cashflow_entry(state: &AgentState, args: &RemoveCashflowArgs) -> AppResult<Applied> {
    let index = resolve_cashflow_entry(&state.cashflow_entries, &args.identifier.as_lookup())?;
    let removed = &state.cashflow_entries[index];
    let preview = serde_json::to_value(removed)?;
    let message = format!("Successfully removed cashflow entry: {}", removed.name);
    let removed_id = removed.id;

    let mut next = state.clone();
    next.cashflow_entries.retain(|entry| entry.id != removed_id);

    Ok(Applied {
        state: next,
        reply: ToolReply::text(message),
        preview,
    })
}

pub fn update_cashflow_entry(state: &AgentState, args: &UpdateCashflowArgs) -> AppResult<Applied> {
    let index = resolve_cashflow_entry(&state.cashflow_entries, &args.identifier.as_lookup())?;
    let mut entry = state.cashflow_entries[index].clone();

    if let Some(name) = non_blank(args.name.as_deref()) {
        entry.name = name.to_string();
    }
    if let Some(amount) = args.amount {
        entry.amount = magnitude(amount)?;
    }
    if let Some(date_due) = non_blank(args.date_due.as_deref()) {
        entry.date_due = parse_date(date_due)?;
    }
    if let Some(flow) = non_blank(args.flow.as_deref()) {
        entry.flow = parse_flow(flow)?;
    }
    if args.customer_id.is_some() {
        entry.customer_id = args.customer_id;
    }

    let preview = serde_json::to_value(&entry)?;
    let message = format!("Successfully updated cashflow entry: {}", entry.name);
    let mut next = state.clone();
    next.cashflow_entries[index] = entry;

    Ok(Applied {
        state: next,
        reply: ToolReply::text(message),
        preview,
    })
}

pub fn set_starting_balance(state: &AgentState, args: &StartingBalanceArgs) -> AppResult<Applied> {
    if !args.amount.is_finite() {
        return Err(AppError::InvalidInput("Starting balance must be a finite number".to_string()));
    }
    let mut next = state.clone();
    next.starting_balance = args.amount;

    Ok(Applied {
        state: next,
        reply: ToolReply::text(format!("Starting balance set to ${:.2}", args.amount)),
        preview: serde_json::json!({ "startingBalance": args.amount }),
    })
}

/// Aggregate view over the ledger. Built from the entries, never from cached totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowSummary {
    pub count: usize,
    #[serde(flatten)]
    pub totals: CashflowTotals,
    pub starting_balance: f64,
    pub projected_balance: f64,
    pub recent: Vec<CashflowEntry>,
}

impl CashflowSummary {
    pub fn from_state(state: &AgentState) -> Self {
        let totals = CashflowTotals::from_entries(&state.cashflow_entries);
        let skip = state.cashflow_entries.len().saturating_sub(RECENT_ENTRY_COUNT);
        Self {
            count: state.cashflow_entries.len(),
            totals,
            starting_balance: state.starting_balance,
            projected_balance: state.starting_balance + totals.net_cashflow,
            recent: state.cashflow_entries[skip..].to_vec(),
        }
    }

    pub fn render(&self) -> String {
        if self.count == 0 {
            return "No cashflow entries found.".to_string();
        }
        let recent = self
            .recent
            .iter()
            .map(|entry| format!("{} ({}${})", entry.name, entry.flow.sign(), entry.amount))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Cashflow Summary:\n- Total Entries: {}\n- Total Inflow: ${:.2}\n- Total Outflow: ${:.2}\n- Net Cashflow: ${:.2}\n- Projected Balance: ${:.2}\n\nRecent entries: {}",
            self.count,
            self.totals.total_inflow,
            self.totals.total_outflow,
            self.totals.net_cashflow,
            self.projected_balance,
            recent
        )
    }
}

pub fn cashflow_summary(state: &AgentState) -> ToolReply {
    ToolReply::text(CashflowSummary::from_state(state).render())
}

fn next_entry_id(state: &AgentState) -> i64 {
    let highest = state
        .cashflow_entries
        .iter()
        .map(|entry| entry.id)
        .max()
        .unwrap_or(0);
    highest.max(state.id_watermarks.cashflow).max(0) + 1
}

fn parse_flow(raw: &str) -> AppResult<FlowType> {
    FlowType::parse(raw).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Unknown cashflow type \"{}\". Expected \"in\" or \"out\"",
            raw
        ))
    })
}

fn parse_date(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .map_err(|_| AppError::InvalidInput(format!("Invalid dateDue \"{}\". Expected YYYY-MM-DD", raw)))
}

fn magnitude(amount: f64) -> AppResult<f64> {
    if amount.is_finite() {
        Ok(amount.abs())
    } else {
        Err(AppError::InvalidInput("Cashflow amount must be a finite number".to_string()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CashflowEntry;

    fn add(state: &AgentState, name: &str, amount: f64, flow: &str) -> AgentState {
        add_cashflow_entry(
            state,
            &AddCashflowArgs {
                name: name.to_string(),
                amount,
                date_due: "2024-02-01".to_string(),
                flow: flow.to_string(),
                customer_id: None,
            },
        )
        .expect("add entry")
        .state
    }

    fn remove(state: &AgentState, identifier: &str) -> AppResult<Applied> {
        remove_cashflow_entry(
            state,
            &RemoveCashflowArgs {
                identifier: EntryIdentifier::Name(identifier.to_string()),
            },
        )
    }

    #[test]
    fn add_stores_magnitude_and_reports_signed_amount() {
        let applied = add_cashflow_entry(
            &AgentState::default(),
            &AddCashflowArgs {
                name: "Invoice A".to_string(),
                amount: -200.0,
                date_due: "2024-02-01".to_string(),
                flow: "in".to_string(),
                customer_id: Some(3),
            },
        )
        .expect("add entry");

        let entry = &applied.state.cashflow_entries[0];
        assert_eq!(entry.amount, 200.0);
        assert_eq!(entry.flow, FlowType::In);
        assert_eq!(entry.customer_id, Some(3));
        assert_eq!(
            applied.reply.message(),
            "Successfully added cashflow entry: Invoice A for +$200 due 2024-02-01"
        );
    }

    #[test]
    fn ids_are_never_reissued_after_removal() {
        let mut state = add(&AgentState::default(), "A", 1.0, "in");
        state = add(&state, "B", 2.0, "out");
        assert_eq!(state.cashflow_entries[1].id, 2);

        state = remove(&state, "2").expect("remove").state;
        state = add(&state, "C", 3.0, "out");
        assert_eq!(state.cashflow_entries.last().map(|entry| entry.id), Some(3));
    }

    #[test]
    fn remove_matches_case_insensitive_substring() {
        let mut state = AgentState::default();
        state.cashflow_entries.push(CashflowEntry {
            id: 1,
            name: "Rent".to_string(),
            amount: 500.0,
            date_due: "2024-01-01".to_string(),
            flow: FlowType::Out,
            customer_id: None,
        });

        let applied = remove(&state, "rent").expect("remove");
        assert!(applied.state.cashflow_entries.is_empty());
        assert_eq!(applied.reply.message(), "Successfully removed cashflow entry: Rent");
    }

    #[test]
    fn remove_unknown_lists_entries() {
        let state = add(&AgentState::default(), "Rent", 500.0, "out");
        let error = remove(&state, "payroll").expect_err("missing");
        assert_eq!(
            error.to_string(),
            "Cashflow entry with identifier \"payroll\" not found. Available entries: 1: Rent"
        );
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let state = add(&AgentState::default(), "Rent", 500.0, "out");
        let applied = update_cashflow_entry(
            &state,
            &UpdateCashflowArgs {
                identifier: EntryIdentifier::Id(1),
                name: Some(String::new()),
                amount: Some(-650.0),
                date_due: None,
                flow: None,
                customer_id: None,
            },
        )
        .expect("update");

        let entry = &applied.state.cashflow_entries[0];
        assert_eq!(entry.id, 1);
        assert_eq!(entry.name, "Rent");
        assert_eq!(entry.amount, 650.0);
        assert_eq!(entry.date_due, "2024-02-01");
        assert_eq!(entry.flow, FlowType::Out);
        assert_eq!(applied.reply.message(), "Successfully updated cashflow entry: Rent");
    }

    #[test]
    fn unknown_direction_and_bad_date_are_invalid() {
        let bad_flow = add_cashflow_entry(
            &AgentState::default(),
            &AddCashflowArgs {
                name: "X".to_string(),
                amount: 1.0,
                date_due: "2024-02-01".to_string(),
                flow: "sideways".to_string(),
                customer_id: None,
            },
        )
        .expect_err("bad flow");
        assert!(matches!(bad_flow, AppError::InvalidInput(_)));

        let bad_date = add_cashflow_entry(
            &AgentState::default(),
            &AddCashflowArgs {
                name: "X".to_string(),
                amount: 1.0,
                date_due: "next week".to_string(),
                flow: "outgoing".to_string(),
                customer_id: None,
            },
        )
        .expect_err("bad date");
        assert!(matches!(bad_date, AppError::InvalidInput(_)));
    }

    #[test]
    fn empty_summary_is_a_distinct_message() {
        assert_eq!(cashflow_summary(&AgentState::default()).message(), "No cashflow entries found.");
    }

    #[test]
    fn summary_totals_and_recent_entries() {
        let mut state = add(&AgentState::default(), "Invoice", 1000.0, "in");
        state = add(&state, "Rent", 400.0, "out");
        state = add(&state, "Payroll", 250.5, "out");
        state = add(&state, "Refund", 20.0, "in");
        state.starting_balance = 100.0;

        let summary = CashflowSummary::from_state(&state);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.totals.total_inflow, 1020.0);
        assert_eq!(summary.totals.total_outflow, 650.5);
        assert_eq!(summary.totals.net_cashflow, 369.5);
        assert_eq!(summary.projected_balance, 469.5);
        assert_eq!(summary.recent.len(), 3);

        let text = summary.render();
        assert!(text.starts_with("Cashflow Summary:\n- Total Entries: 4\n- Total Inflow: $1020.00"));
        assert!(text.ends_with("Recent entries: Rent (-$400), Payroll (-$250.5), Refund (+$20)"));
    }

    #[test]
    fn starting_balance_is_replaced() {
        let applied = set_starting_balance(&AgentState::default(), &StartingBalanceArgs { amount: -42.5 })
            .expect("balance");
        assert_eq!(applied.state.starting_balance, -42.5);
        assert!(set_starting_balance(&AgentState::default(), &StartingBalanceArgs { amount: f64::NAN }).is_err());
    }

    #[test]
    fn identifiers_deserialize_from_whole_numbers_and_names() {
        let parse = |value: serde_json::Value| serde_json::from_value::<EntryIdentifier>(value);
        assert_eq!(parse(serde_json::json!(3)).expect("int"), EntryIdentifier::Id(3));
        assert_eq!(parse(serde_json::json!(3.0)).expect("float"), EntryIdentifier::Id(3));
        assert_eq!(
            parse(serde_json::json!("01")).expect("name"),
            EntryIdentifier::Name("01".to_string())
        );
        let error = parse(serde_json::json!(1.5)).expect_err("fraction");
        assert!(error.to_string().contains("identifier 1.5 is not a whole number"));
    }
}
