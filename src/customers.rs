//! Creditor and debitor CRUD. Each pool is its own id namespace.

use crate::errors::{AppError, AppResult};
use crate::models::{AgentState, Customer, CustomerPool, ToolReply};
use crate::mutation::Applied;
use crate::resolver::resolve_customer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCustomerArgs {
    pub pool: CustomerPool,
    pub business_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub links: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerArgs {
    pub pool: CustomerPool,
    pub id: i64,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub links: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCustomerArgs {
    pub pool: CustomerPool,
    pub id: i64,
}

pub fn add_customer(state: &AgentState, args: &AddCustomerArgs) -> AppResult<Applied> {
    let business_name = args.business_name.trim();
    if business_name.is_empty() {
        return Err(AppError::InvalidInput("businessName must not be empty".to_string()));
    }

    let mut next = state.clone();
    let id = next_customer_id(&next, args.pool);
    next.set_customer_watermark(args.pool, id);
    let customer = Customer {
        id,
        business_name: business_name.to_string(),
        phone_number: args.phone_number.clone(),
        email_address: args.email_address.clone(),
        links: args.links.clone(),
    };
    let preview = serde_json::to_value(&customer)?;
    let message = format!("Added {} \"{}\" with id {}", args.pool.as_str(), customer.business_name, id);
    next.customers_mut(args.pool).push(customer);

    Ok(Applied {
        state: next,
        reply: ToolReply::success(message),
        preview,
    })
}

pub fn update_customer(state: &AgentState, args: &UpdateCustomerArgs) -> AppResult<Applied> {
    let index = resolve_customer(state.customers(args.pool), args.pool, args.id)?;
    let mut customer = state.customers(args.pool)[index].clone();

    if let Some(name) = args.business_name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
        customer.business_name = name.to_string();
    }
    if args.phone_number.is_some() {
        customer.phone_number = args.phone_number.clone();
    }
    if args.email_address.is_some() {
        customer.email_address = args.email_address.clone();
    }
    if args.links.is_some() {
        customer.links = args.links.clone();
    }

    let preview = serde_json::to_value(&customer)?;
    let message = format!("Updated {} \"{}\"", args.pool.as_str(), customer.business_name);
    let mut next = state.clone();
    next.customers_mut(args.pool)[index] = customer;

    Ok(Applied {
        state: next,
        reply: ToolReply::success(message),
        preview,
    })
}

pub fn delete_customer(state: &AgentState, args: &DeleteCustomerArgs) -> AppResult<Applied> {
    let index = resolve_customer(state.customers(args.pool), args.pool, args.id)?;
    let removed = &state.customers(args.pool)[index];
    let preview = serde_json::to_value(removed)?;
    let message = format!("Deleted {} \"{}\"", args.pool.as_str(), removed.business_name);

    let mut next = state.clone();
    next.customers_mut(args.pool).remove(index);

    Ok(Applied {
        state: next,
        reply: ToolReply::success(message),
        preview,
    })
}

fn next_customer_id(state: &AgentState, pool: CustomerPool) -> i64 {
    let highest = state
        .customers(pool)
        .iter()
        .map(|customer| customer.id)
        .max()
        .unwrap_or(0);
    highest.max(state.customer_watermark(pool)).max(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(state: &AgentState, pool: CustomerPool, name: &str) -> AgentState {
        add_customer(
            state,
            &AddCustomerArgs {
                pool,
                business_name: name.to_string(),
                phone_number: None,
                email_address: None,
                links: None,
            },
        )
        .expect("add customer")
        .state
    }

    #[test]
    fn pools_allocate_ids_independently() {
        let mut state = add(&AgentState::default(), CustomerPool::Creditor, "Acme");
        state = add(&state, CustomerPool::Creditor, "Globex");
        state = add(&state, CustomerPool::Debitor, "Initech");

        assert_eq!(state.creditors.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.debitors[0].id, 1);
    }

    #[test]
    fn deleted_ids_are_not_reused_within_pool() {
        let mut state = add(&AgentState::default(), CustomerPool::Debitor, "Acme");
        state = add(&state, CustomerPool::Debitor, "Globex");
        state = delete_customer(&state, &DeleteCustomerArgs { pool: CustomerPool::Debitor, id: 2 })
            .expect("delete")
            .state;
        state = add(&state, CustomerPool::Debitor, "Umbrella");
        assert_eq!(state.debitors.last().map(|c| c.id), Some(3));
    }

    #[test]
    fn update_is_pool_scoped_and_partial() {
        let state = add(&AgentState::default(), CustomerPool::Creditor, "Acme");
        let error = update_customer(
            &state,
            &UpdateCustomerArgs {
                pool: CustomerPool::Debitor,
                id: 1,
                business_name: Some("Other".to_string()),
                phone_number: None,
                email_address: None,
                links: None,
            },
        )
        .expect_err("wrong pool");
        assert!(matches!(error, AppError::NotFound(_)));

        let applied = update_customer(
            &state,
            &UpdateCustomerArgs {
                pool: CustomerPool::Creditor,
                id: 1,
                business_name: None,
                phone_number: Some("555-0100".to_string()),
                email_address: None,
                links: None,
            },
        )
        .expect("update");
        let customer = &applied.state.creditors[0];
        assert_eq!(customer.business_name, "Acme");
        assert_eq!(customer.phone_number.as_deref(), Some("555-0100"));
        assert_eq!(applied.reply.message(), "Updated creditor \"Acme\"");
    }

    #[test]
    fn blank_business_name_is_rejected() {
        let error = add_customer(
            &AgentState::default(),
            &AddCustomerArgs {
                pool: CustomerPool::Creditor,
                business_name: "  ".to_string(),
                phone_number: None,
                email_address: None,
                links: None,
            },
        )
        .expect_err("blank");
        assert!(matches!(error, AppError::InvalidInput(_)));
    }
}
