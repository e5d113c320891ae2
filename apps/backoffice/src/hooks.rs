//! # Post-Approval Hooks
//!
//! Side effects that must land in the same commit as an approval.
//!
//! ```text
//! review(Approve)
//!    │
//!    ├── save_review_in(batch)        status Pending → Approved
//!    ├── hook.on_approved(batch) ...  e.g. expense row + payroll deduction
//!    └── batch.commit()               all of it, or none of it
//! ```

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use pumpdesk_core::{Actor, Expense, FinanceRequest, RequestPayload, ReviewableRequest};
use pumpdesk_db::{generate_id, DbResult, ExpenseRepository, StaffRepository, WriteBatch};

use crate::state::local_today;

/// Runs inside the review's write batch after the status change.
#[async_trait]
pub trait ApprovalHook<P: RequestPayload>: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    async fn on_approved(
        &self,
        request: &ReviewableRequest<P>,
        actor: &Actor,
        batch: &mut WriteBatch,
    ) -> DbResult<()>;
}

/// Pays out an approved staff-advance ticket: one `SALARY_ADVANCE` expense
/// and the matching increment of the member's `advance_taken`.
///
/// General tickets pass through untouched.
pub struct SalaryAdvanceHook;

#[async_trait]
impl ApprovalHook<FinanceRequest> for SalaryAdvanceHook {
    fn name(&self) -> &'static str {
        "salary_advance"
    }

    async fn on_approved(
        &self,
        request: &ReviewableRequest<FinanceRequest>,
        actor: &Actor,
        batch: &mut WriteBatch,
    ) -> DbResult<()> {
        let Some(staff) = request.payload.advance_target() else {
            return Ok(());
        };
        let amount = request.payload.amount;

        let expense = Expense::salary_advance(
            generate_id(),
            staff,
            amount,
            local_today(),
            actor.display_name(),
            Utc::now(),
        );
        ExpenseRepository::insert_in(batch, &expense).await?;
        let member = StaffRepository::apply_advance_in(batch, &staff.id, amount).await?;

        info!(
            ticket = %request.id,
            staff_id = %staff.id,
            amount = %amount,
            advance_taken = %member.advance_taken,
            "Advance staged for approved ticket"
        );
        Ok(())
    }
}
