//! # Khata Services
//!
//! Credit customers and their ledgers. A customer's due is never stored;
//! it is folded from the transaction lines every time it is asked for.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use pumpdesk_core::ledger::{compute_customer_balance, compute_total_dues, CustomerBalance};
use pumpdesk_core::validation::{validate_name, validate_positive, validate_search_query};
use pumpdesk_core::{Customer, Money, Transaction, TransactionKind};
use pumpdesk_db::{generate_id, Collection};

use crate::error::{ServiceError, ServiceResult};
use crate::identity::Caller;
use crate::services::with_snapshot_fallback;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub customer_id: String,
    pub kind: TransactionKind,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub receipt_ref: Option<String>,
}

pub async fn add_customer(state: &AppState, actor: &Caller, name: &str) -> ServiceResult<Customer> {
    actor.require_operator("add customers")?;
    validate_name(name)?;

    let customer = Customer {
        id: generate_id(),
        name: name.trim().to_string(),
        created_at: Utc::now(),
    };
    state.db().customers().insert(&customer).await?;

    info!(id = %customer.id, name = %customer.name, "Customer added");
    Ok(customer)
}

/// Customers, most recently added first.
pub async fn list_customers(state: &AppState, _actor: &Caller) -> ServiceResult<Vec<Customer>> {
    let fetched = state.db().customers().list().await;
    with_snapshot_fallback(state, Collection::Customers, fetched).await
}

/// Case-insensitive name search. A blank query lists everyone.
pub async fn search_customers(
    state: &AppState,
    _actor: &Caller,
    query: &str,
) -> ServiceResult<Vec<Customer>> {
    let query = validate_search_query(query)?;
    Ok(state.db().customers().search_by_name(&query).await?)
}

pub async fn add_transaction(
    state: &AppState,
    actor: &Caller,
    input: NewTransaction,
) -> ServiceResult<Transaction> {
    actor.require_operator("record khata entries")?;
    validate_positive("amount", input.amount.paise())?;

    if state.db().customers().get_by_id(&input.customer_id).await?.is_none() {
        return Err(ServiceError::not_found("Customer", &input.customer_id));
    }

    let tx = Transaction {
        id: generate_id(),
        customer_id: input.customer_id,
        kind: input.kind,
        amount: input.amount,
        date: input.date,
        note: input.note.trim().to_string(),
        receipt_ref: input.receipt_ref,
        created_at: Utc::now(),
    };
    state.db().transactions().insert(&tx).await?;

    info!(id = %tx.id, customer_id = %tx.customer_id, kind = ?tx.kind, amount = %tx.amount, "Khata entry recorded");
    Ok(tx)
}

/// One customer's khata, newest first.
pub async fn list_transactions(
    state: &AppState,
    _actor: &Caller,
    customer_id: &str,
) -> ServiceResult<Vec<Transaction>> {
    Ok(state.db().transactions().list_for_customer(customer_id).await?)
}

pub async fn customer_balance(
    state: &AppState,
    actor: &Caller,
    customer_id: &str,
) -> ServiceResult<CustomerBalance> {
    let transactions = list_transactions(state, actor, customer_id).await?;
    Ok(compute_customer_balance(&transactions))
}

/// Net amount owed to the station by all customers.
pub async fn total_dues(state: &AppState, _actor: &Caller) -> ServiceResult<Money> {
    let fetched = state.db().transactions().list().await;
    let transactions = with_snapshot_fallback(state, Collection::Transactions, fetched).await?;
    Ok(compute_total_dues(&transactions))
}

/// Removes a customer together with their khata.
pub async fn delete_customer(state: &AppState, actor: &Caller, id: &str) -> ServiceResult<()> {
    actor.require_admin("delete customers")?;
    state.db().customers().delete(id).await?;
    info!(id = %id, by = %actor.display_name(), "Customer deleted");
    Ok(())
}

pub async fn delete_transaction(state: &AppState, actor: &Caller, id: &str) -> ServiceResult<()> {
    actor.require_admin("delete khata entries")?;
    state.db().transactions().delete(id).await?;
    info!(id = %id, by = %actor.display_name(), "Khata entry deleted");
    Ok(())
}
