//! Running costs of the station.
//!
//! Salary advances also land in this collection, but only through
//! [`crate::services::staff::record_advance`] or an approved ticket, so the
//! payroll deduction is never skipped.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use pumpdesk_core::ledger::compute_monthly_expense_total;
use pumpdesk_core::validation::{validate_positive, validate_required_text};
use pumpdesk_core::{Expense, ExpenseKind, Money};
use pumpdesk_db::{generate_id, Collection};

use crate::error::ServiceResult;
use crate::identity::Caller;
use crate::services::with_snapshot_fallback;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub receipt_ref: Option<String>,
}

pub async fn add_expense(state: &AppState, actor: &Caller, input: NewExpense) -> ServiceResult<Expense> {
    actor.require_operator("record expenses")?;
    validate_required_text("description", &input.description)?;
    validate_positive("amount", input.amount.paise())?;

    let expense = Expense {
        id: generate_id(),
        kind: ExpenseKind::Expense,
        description: input.description.trim().to_string(),
        amount: input.amount,
        date: input.date,
        staff_id: None,
        created_by: actor.display_name().to_string(),
        receipt_ref: input.receipt_ref,
        created_at: Utc::now(),
    };
    state.db().expenses().insert(&expense).await?;

    info!(id = %expense.id, amount = %expense.amount, "Expense recorded");
    Ok(expense)
}

/// Expenses, newest date first.
pub async fn list_expenses(state: &AppState, _actor: &Caller) -> ServiceResult<Vec<Expense>> {
    let fetched = state.db().expenses().list().await;
    with_snapshot_fallback(state, Collection::Expenses, fetched).await
}

pub async fn delete_expense(state: &AppState, actor: &Caller, id: &str) -> ServiceResult<()> {
    actor.require_admin("delete expenses")?;
    state.db().expenses().delete(id).await?;
    info!(id = %id, by = %actor.display_name(), "Expense deleted");
    Ok(())
}

/// Total spent in the calendar month containing `day`, advances included.
pub async fn monthly_total(state: &AppState, actor: &Caller, day: NaiveDate) -> ServiceResult<Money> {
    let expenses = list_expenses(state, actor).await?;
    Ok(compute_monthly_expense_total(&expenses, day.year(), day.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{actor, test_state};
    use pumpdesk_core::Role;

    fn cost(description: &str, rupees: i64, month: u32) -> NewExpense {
        NewExpense {
            description: description.to_string(),
            amount: Money::from_rupees(rupees),
            date: NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
            receipt_ref: None,
        }
    }

    #[tokio::test]
    async fn test_monthly_total_only_counts_that_month() {
        let (_dir, state) = test_state().await;
        let manager = actor(Role::Manager);
        add_expense(&state, &manager, cost("Electricity", 4_000, 2)).await.unwrap();
        add_expense(&state, &manager, cost("Generator diesel", 1_500, 2)).await.unwrap();
        add_expense(&state, &manager, cost("Electricity", 3_800, 3)).await.unwrap();

        let feb = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            monthly_total(&state, &manager, feb).await.unwrap(),
            Money::from_rupees(5_500)
        );
    }

    #[tokio::test]
    async fn test_blank_description_rejected() {
        let (_dir, state) = test_state().await;

        let err = add_expense(&state, &actor(Role::Admin), cost("  ", 100, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
