use crate::models::{
    AgentState, CashflowEntry, Chart, ChartDataRecord, ChartSpec, Customer, DataValue, FlowType, IdWatermarks, Metric,
    MetricIcon,
};
use crate::settings::{DashboardSettings, SeedKind};

/// Starting state for a new session.
pub fn initial_state(settings: &DashboardSettings) -> AgentState {
    let mut state = match settings.seed {
        SeedKind::Empty => AgentState::with_title(settings.title.clone()),
        SeedKind::Demo => demo_state(&settings.title),
    };
    state.refresh_totals();
    state
}

pub fn demo_state(title: &str) -> AgentState {
    let mut state = AgentState::with_title(title);
    state.charts = vec![
        Chart {
            spec: ChartSpec::Line {
                title: "Sales by day".to_string(),
                x: "x".to_string(),
                y: "y".to_string(),
            },
            data: rows(&[("2024-01-01", 100), ("2024-01-02", 200), ("2024-01-03", 300)]),
        },
        Chart {
            spec: ChartSpec::Bar {
                title: "Sales by product".to_string(),
                x: "x".to_string(),
                y: "y".to_string(),
            },
            data: rows(&[("Smartphone", 100), ("Tablet", 200), ("Laptop", 300)]),
        },
    ];
    state.pinned_metrics = vec![
        Metric {
            id: "1".to_string(),
            title: "Total sales".to_string(),
            value: "1000".to_string(),
            hint: Some("Total sales for the last 30 days".to_string()),
            icon: Some(MetricIcon::Mrr),
        },
        Metric {
            id: "2".to_string(),
            title: "Best selling product".to_string(),
            value: "Laptop".to_string(),
            hint: Some("Total sales for the last 30 days".to_string()),
            icon: Some(MetricIcon::Conversion),
        },
    ];
    state.cashflow_entries = vec![
        entry(1, "Invoice 1042", 2400.0, "2024-02-01", FlowType::In, Some(1)),
        entry(2, "Office rent", 950.0, "2024-02-05", FlowType::Out, Some(1)),
        entry(3, "Software licences", 180.0, "2024-02-12", FlowType::Out, None),
    ];
    state.creditors = vec![customer(1, "Northwind Properties", "accounts@northwind.example")];
    state.debitors = vec![customer(1, "Contoso Retail", "billing@contoso.example")];
    state.id_watermarks = IdWatermarks {
        cashflow: 3,
        creditors: 1,
        debitors: 1,
    };
    state
}

fn rows(points: &[(&str, u64)]) -> Vec<ChartDataRecord> {
    points
        .iter()
        .map(|(x, y)| {
            ChartDataRecord::from([
                ("x".to_string(), DataValue::Text(x.to_string())),
                ("y".to_string(), DataValue::Number((*y).into())),
            ])
        })
        .collect()
}

fn entry(id: i64, name: &str, amount: f64, date_due: &str, flow: FlowType, customer_id: Option<i64>) -> CashflowEntry {
    CashflowEntry {
        id,
        name: name.to_string(),
        amount,
        date_due: date_due.to_string(),
        flow,
        customer_id,
    }
}

fn customer(id: i64, business_name: &str, email_address: &str) -> Customer {
    Customer {
        id,
        business_name: business_name.to_string(),
        phone_number: None,
        email_address: Some(email_address.to_string()),
        links: None,
    }
}
