//! Staff roster, payroll payable and direct salary advances.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use pumpdesk_core::ledger::compute_staff_payable;
use pumpdesk_core::validation::{validate_email, validate_name, validate_non_negative, validate_positive};
use pumpdesk_core::{Expense, Money, StaffMember, StaffRef};
use pumpdesk_db::{generate_id, Collection, ExpenseRepository, StaffRepository};

use crate::error::{ServiceError, ServiceResult};
use crate::identity::Caller;
use crate::services::with_snapshot_fallback;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub name: String,
    /// Job title, e.g. "Attendant".
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: String,
    pub monthly_salary: Money,
}

pub async fn add_staff(state: &AppState, actor: &Caller, input: NewStaff) -> ServiceResult<StaffMember> {
    actor.require_operator("add staff")?;
    validate_name(&input.name)?;
    if !input.email.trim().is_empty() {
        validate_email(&input.email)?;
    }
    validate_non_negative("monthly_salary", input.monthly_salary.paise())?;

    let member = StaffMember {
        id: generate_id(),
        name: input.name.trim().to_string(),
        role: input.role.trim().to_string(),
        email: input.email.trim().to_string(),
        monthly_salary: input.monthly_salary,
        advance_taken: Money::zero(),
        payable_salary: Some(input.monthly_salary),
        created_at: Utc::now(),
    };
    state.db().staff().insert(&member).await?;

    info!(id = %member.id, name = %member.name, "Staff member added");
    Ok(member)
}

/// The roster, alphabetical.
pub async fn list_staff(state: &AppState, _actor: &Caller) -> ServiceResult<Vec<StaffMember>> {
    let fetched = state.db().staff().list().await;
    with_snapshot_fallback(state, Collection::Staff, fetched).await
}

pub async fn delete_staff(state: &AppState, actor: &Caller, id: &str) -> ServiceResult<()> {
    actor.require_admin("delete staff")?;
    state.db().staff().delete(id).await?;
    info!(id = %id, by = %actor.display_name(), "Staff member deleted");
    Ok(())
}

/// Salary still owed to a member this month, recomputed from primitives.
pub async fn staff_payable(state: &AppState, _actor: &Caller, id: &str) -> ServiceResult<Money> {
    let member = state
        .db()
        .staff()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Staff", id))?;
    Ok(compute_staff_payable(&member))
}

/// An admin paying an advance straight out, without a ticket.
///
/// The expense row and the payroll deduction are committed together.
pub async fn record_advance(
    state: &AppState,
    actor: &Caller,
    staff_id: &str,
    amount: Money,
    date: NaiveDate,
) -> ServiceResult<StaffMember> {
    actor.require_admin("record salary advances")?;
    validate_positive("amount", amount.paise())?;

    let member = state
        .db()
        .staff()
        .get_by_id(staff_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Staff", staff_id))?;
    let staff = StaffRef {
        id: member.id,
        name: member.name,
    };
    let expense = Expense::salary_advance(
        generate_id(),
        &staff,
        amount,
        date,
        actor.display_name(),
        Utc::now(),
    );

    let mut batch = state.db().begin_batch().await?;
    ExpenseRepository::insert_in(&mut batch, &expense).await?;
    let updated = StaffRepository::apply_advance_in(&mut batch, &staff.id, amount).await?;
    batch.commit().await?;

    info!(
        staff_id = %staff.id,
        amount = %amount,
        payable = %updated.recomputed_payable(),
        by = %actor.display_name(),
        "Salary advance recorded"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{actor, test_state};
    use pumpdesk_core::ledger::compute_staff_advances;
    use pumpdesk_core::Role;

    fn ravi() -> NewStaff {
        NewStaff {
            name: "Ravi".to_string(),
            role: "Attendant".to_string(),
            email: String::new(),
            monthly_salary: Money::from_rupees(15_000),
        }
    }

    #[tokio::test]
    async fn test_direct_advance_writes_expense_and_payroll() {
        let (_dir, state) = test_state().await;
        let admin = actor(Role::Admin);
        let member = add_staff(&state, &admin, ravi()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let updated = record_advance(&state, &admin, &member.id, Money::from_rupees(2_000), day)
            .await
            .unwrap();
        assert_eq!(updated.advance_taken, Money::from_rupees(2_000));
        assert_eq!(
            staff_payable(&state, &admin, &member.id).await.unwrap(),
            Money::from_rupees(13_000)
        );

        let expenses = state.db().expenses().list().await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(compute_staff_advances(&expenses, &member.id), updated.advance_taken);
    }

    #[tokio::test]
    async fn test_manager_cannot_advance_directly() {
        let (_dir, state) = test_state().await;
        let member = add_staff(&state, &actor(Role::Manager), ravi()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let err = record_advance(&state, &actor(Role::Manager), &member.id, Money::from_rupees(500), day)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { .. }));
        assert!(state.db().expenses().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_staff_is_not_found() {
        let (_dir, state) = test_state().await;
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let err = record_advance(&state, &actor(Role::Admin), "ghost", Money::from_rupees(500), day)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}
