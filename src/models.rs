use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Chart Data ─────────────────────────────────────────────────────────────

/// A single chart cell. Only strings and numbers survive normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Number(serde_json::Number),
    Text(String),
}

impl DataValue {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(number) => Some(Self::Number(number.clone())),
            serde_json::Value::String(text) => Some(Self::Text(text.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{}", number),
            Self::Text(text) => f.write_str(text),
        }
    }
}

pub type ChartDataRecord = BTreeMap<String, DataValue>;

// ─── Charts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "pie")]
    Pie,
    #[serde(rename = "scalar")]
    Scalar,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "stackedBar")]
    StackedBar,
    #[serde(rename = "groupedBar")]
    GroupedBar,
    #[serde(rename = "heatmap")]
    Heatmap,
    #[serde(rename = "tree", alias = "treemap")]
    Tree,
}

impl ChartKind {
    pub const ALL: [ChartKind; 9] = [
        Self::Line,
        Self::Bar,
        Self::Pie,
        Self::Scalar,
        Self::Table,
        Self::StackedBar,
        Self::GroupedBar,
        Self::Heatmap,
        Self::Tree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Scalar => "scalar",
            Self::Table => "table",
            Self::StackedBar => "stackedBar",
            Self::GroupedBar => "groupedBar",
            Self::Heatmap => "heatmap",
            Self::Tree => "tree",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "treemap" {
            return Some(Self::Tree);
        }
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Data-free description of a chart's shape. One variant per supported chart type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ChartSpec {
    #[serde(rename = "line")]
    Line { title: String, x: String, y: String },
    #[serde(rename = "bar")]
    Bar { title: String, x: String, y: String },
    #[serde(rename = "pie")]
    Pie { title: String, x: String, y: String },
    #[serde(rename = "scalar")]
    Scalar {
        title: String,
        value_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<DataValue>,
    },
    #[serde(rename = "table")]
    Table { title: String, columns: Vec<String> },
    #[serde(rename = "stackedBar")]
    StackedBar { title: String, x: String, y: Vec<String> },
    #[serde(rename = "groupedBar")]
    GroupedBar { title: String, x: String, y: Vec<String> },
    #[serde(rename = "heatmap")]
    Heatmap {
        title: String,
        x: String,
        y: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matrix: Option<Vec<Vec<f64>>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x_labels: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y_labels: Option<Vec<String>>,
    },
    #[serde(rename = "tree", alias = "treemap")]
    Tree {
        title: String,
        name_key: String,
        value_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nodes: Option<Vec<TreeNode>>,
    },
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            Self::Line { .. } => ChartKind::Line,
            Self::Bar { .. } => ChartKind::Bar,
            Self::Pie { .. } => ChartKind::Pie,
            Self::Scalar { .. } => ChartKind::Scalar,
            Self::Table { .. } => ChartKind::Table,
            Self::StackedBar { .. } => ChartKind::StackedBar,
            Self::GroupedBar { .. } => ChartKind::GroupedBar,
            Self::Heatmap { .. } => ChartKind::Heatmap,
            Self::Tree { .. } => ChartKind::Tree,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Line { title, .. }
            | Self::Bar { title, .. }
            | Self::Pie { title, .. }
            | Self::Scalar { title, .. }
            | Self::Table { title, .. }
            | Self::StackedBar { title, .. }
            | Self::GroupedBar { title, .. }
            | Self::Heatmap { title, .. }
            | Self::Tree { title, .. } => title,
        }
    }

    pub fn x(&self) -> Option<&str> {
        match self {
            Self::Line { x, .. }
            | Self::Bar { x, .. }
            | Self::Pie { x, .. }
            | Self::StackedBar { x, .. }
            | Self::GroupedBar { x, .. }
            | Self::Heatmap { x, .. } => Some(x),
            Self::Scalar { .. } | Self::Table { .. } | Self::Tree { .. } => None,
        }
    }

    /// The `y` field when it names a single series.
    pub fn single_y(&self) -> Option<&str> {
        match self {
            Self::Line { y, .. } | Self::Bar { y, .. } | Self::Pie { y, .. } | Self::Heatmap { y, .. } => Some(y),
            Self::Scalar { .. }
            | Self::Table { .. }
            | Self::StackedBar { .. }
            | Self::GroupedBar { .. }
            | Self::Tree { .. } => None,
        }
    }

    /// The `y` field when it lists several series.
    pub fn series_y(&self) -> Option<&[String]> {
        match self {
            Self::StackedBar { y, .. } | Self::GroupedBar { y, .. } => Some(y),
            Self::Line { .. }
            | Self::Bar { .. }
            | Self::Pie { .. }
            | Self::Scalar { .. }
            | Self::Table { .. }
            | Self::Heatmap { .. }
            | Self::Tree { .. } => None,
        }
    }

    pub fn value_key(&self) -> Option<&str> {
        match self {
            Self::Scalar { value_key, .. } | Self::Tree { value_key, .. } => Some(value_key),
            _ => None,
        }
    }

    pub fn name_key(&self) -> Option<&str> {
        match self {
            Self::Tree { name_key, .. } => Some(name_key),
            _ => None,
        }
    }

    pub fn columns(&self) -> Option<&[String]> {
        match self {
            Self::Table { columns, .. } => Some(columns),
            _ => None,
        }
    }

    pub fn format(&self) -> Option<&str> {
        match self {
            Self::Scalar { format, .. } => format.as_deref(),
            _ => None,
        }
    }

    pub fn scalar_value(&self) -> Option<&DataValue> {
        match self {
            Self::Scalar { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    /// Heatmap cell field name.
    pub fn value_field(&self) -> Option<&str> {
        match self {
            Self::Heatmap { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Self::Heatmap { matrix, .. } => matrix.as_deref(),
            _ => None,
        }
    }

    pub fn x_labels(&self) -> Option<&[String]> {
        match self {
            Self::Heatmap { x_labels, .. } => x_labels.as_deref(),
            _ => None,
        }
    }

    pub fn y_labels(&self) -> Option<&[String]> {
        match self {
            Self::Heatmap { y_labels, .. } => y_labels.as_deref(),
            _ => None,
        }
    }

    pub fn nodes(&self) -> Option<&[TreeNode]> {
        match self {
            Self::Tree { nodes, .. } => nodes.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(flatten)]
    pub spec: ChartSpec,
    #[serde(default)]
    pub data: Vec<ChartDataRecord>,
}

impl Chart {
    pub fn title(&self) -> &str {
        self.spec.title()
    }
}

// ─── Metrics ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricIcon {
    Users,
    Mrr,
    Conversion,
    Churn,
    Custom,
}

impl MetricIcon {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Mrr => "mrr",
            Self::Conversion => "conversion",
            Self::Churn => "churn",
            Self::Custom => "custom",
        }
    }

    /// Unknown icon names fall back to `custom`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "users" => Self::Users,
            "mrr" => Self::Mrr,
            "conversion" => Self::Conversion,
            "churn" => Self::Churn,
            _ => Self::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: String,
    pub title: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<MetricIcon>,
}

// ─── Cashflow ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    #[serde(rename = "in", alias = "inflow", alias = "incoming")]
    In,
    #[serde(rename = "out", alias = "outflow", alias = "outgoing")]
    Out,
}

impl FlowType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn sign(self) -> &'static str {
        match self {
            Self::In => "+",
            Self::Out => "-",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in" | "inflow" | "incoming" => Some(Self::In),
            "out" | "outflow" | "outgoing" => Some(Self::Out),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowEntry {
    pub id: i64,
    pub name: String,
    /// Always a non-negative magnitude; direction lives in `flow`.
    pub amount: f64,
    pub date_due: String,
    #[serde(rename = "type")]
    pub flow: FlowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowTotals {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub net_cashflow: f64,
}

impl CashflowTotals {
    pub fn from_entries(entries: &[CashflowEntry]) -> Self {
        let (total_inflow, total_outflow) =
            entries
                .iter()
                .fold((0.0_f64, 0.0_f64), |(inflow, outflow), entry| match entry.flow {
                    FlowType::In => (inflow + entry.amount, outflow),
                    FlowType::Out => (inflow, outflow + entry.amount.abs()),
                });
        Self {
            total_inflow,
            total_outflow,
            net_cashflow: total_inflow - total_outflow,
        }
    }
}

// ─── Customers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerPool {
    #[serde(rename = "creditor", alias = "creditors")]
    Creditor,
    #[serde(rename = "debitor", alias = "debitors")]
    Debitor,
}

impl CustomerPool {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creditor => "creditor",
            Self::Debitor => "debitor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<String>,
}

// ─── Agent State ────────────────────────────────────────────────────────────

/// Highest id ever issued per collection, so deleted ids are never handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdWatermarks {
    pub cashflow: i64,
    pub creditors: i64,
    pub debitors: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub title: String,
    #[serde(default)]
    pub charts: Vec<Chart>,
    #[serde(default)]
    pub pinned_metrics: Vec<Metric>,
    #[serde(default)]
    pub cashflow_entries: Vec<CashflowEntry>,
    #[serde(default)]
    pub starting_balance: f64,
    #[serde(default)]
    pub creditors: Vec<Customer>,
    #[serde(default)]
    pub debitors: Vec<Customer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_inflow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_outflow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_cashflow: Option<f64>,
    #[serde(default)]
    pub id_watermarks: IdWatermarks,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::with_title("Dashboard")
    }
}

impl AgentState {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            charts: Vec::new(),
            pinned_metrics: Vec::new(),
            cashflow_entries: Vec::new(),
            starting_balance: 0.0,
            creditors: Vec::new(),
            debitors: Vec::new(),
            total_inflow: None,
            total_outflow: None,
            net_cashflow: None,
            id_watermarks: IdWatermarks::default(),
        }
    }

    /// Recompute the cached cashflow totals from the entries.
    pub fn refresh_totals(&mut self) {
        let totals = CashflowTotals::from_entries(&self.cashflow_entries);
        self.total_inflow = Some(totals.total_inflow);
        self.total_outflow = Some(totals.total_outflow);
        self.net_cashflow = Some(totals.net_cashflow);
    }

    pub fn customers(&self, pool: CustomerPool) -> &[Customer] {
        match pool {
            CustomerPool::Creditor => &self.creditors,
            CustomerPool::Debitor => &self.debitors,
        }
    }

    pub fn customers_mut(&mut self, pool: CustomerPool) -> &mut Vec<Customer> {
        match pool {
            CustomerPool::Creditor => &mut self.creditors,
            CustomerPool::Debitor => &mut self.debitors,
        }
    }

    pub fn customer_watermark(&self, pool: CustomerPool) -> i64 {
        match pool {
            CustomerPool::Creditor => self.id_watermarks.creditors,
            CustomerPool::Debitor => self.id_watermarks.debitors,
        }
    }

    pub fn set_customer_watermark(&mut self, pool: CustomerPool, id: i64) {
        match pool {
            CustomerPool::Creditor => self.id_watermarks.creditors = id,
            CustomerPool::Debitor => self.id_watermarks.debitors = id,
        }
    }
}

// ─── Tool Replies ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Success,
    Declined,
}

/// What a tool call hands back to the agent: a bare string or a `{status, message}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolReply {
    Status { status: ReplyStatus, message: String },
    Text(String),
}

impl ToolReply {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Status {
            status: ReplyStatus::Success,
            message: message.into(),
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self::Status {
            status: ReplyStatus::Declined,
            message: message.into(),
        }
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self::Text(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Text(message) => message,
        }
    }
}
