//! # Approval Tickets & Leave Requests
//!
//! Both run through the same review path:
//!
//! ```text
//! load ──► ReviewableRequest::review (role + terminal checks, in memory)
//!   │
//!   ▼
//! begin_batch ──► save_review_in (WHERE status = 'Pending')
//!   │                 └─ 0 rows: someone else reviewed first → CONFLICT
//!   ▼
//! hooks (approvals only) ──fail──► rollback → INCONSISTENCY
//!   │
//!   ▼
//! commit
//! ```

use chrono::Utc;
use tracing::{error, info};

use pumpdesk_core::{
    visible_to, ApprovalTicket, Decision, FinanceKind, FinanceRequest, LeaveDetails,
    LeaveRequest, RequestPayload, ReviewableRequest, StaffRef,
};
use pumpdesk_db::{generate_id, RequestRepository};

use crate::error::{ServiceError, ServiceResult};
use crate::hooks::{ApprovalHook, SalaryAdvanceHook};
use crate::identity::Caller;
use crate::services::with_snapshot_fallback;
use crate::state::AppState;

// =============================================================================
// Approval Tickets
// =============================================================================

/// Raises a finance ticket.
///
/// A staff-advance ticket must name someone on the roster; the name stored
/// on the ticket is the roster's.
pub async fn raise_approval(
    state: &AppState,
    actor: &Caller,
    mut request: FinanceRequest,
) -> ServiceResult<ApprovalTicket> {
    if let FinanceKind::StaffAdvance { staff } = &request.kind {
        let member = state
            .db()
            .staff()
            .get_by_id(&staff.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Staff", &staff.id))?;
        request.kind = FinanceKind::StaffAdvance {
            staff: StaffRef {
                id: member.id,
                name: member.name,
            },
        };
    }

    raise(state.db().approvals(), actor, request).await
}

/// Tickets the caller may see, newest first.
pub async fn list_approvals(state: &AppState, actor: &Caller) -> ServiceResult<Vec<ApprovalTicket>> {
    let repo = state.db().approvals();
    let fetched = repo.list().await;
    let all = with_snapshot_fallback(state, repo.collection(), fetched).await?;
    Ok(visible_to(all, actor))
}

/// Approves or rejects a ticket. Approving a staff-advance ticket also pays
/// the advance out, in the same commit.
pub async fn review_approval(
    state: &AppState,
    actor: &Caller,
    id: &str,
    decision: Decision,
) -> ServiceResult<ApprovalTicket> {
    let hooks: [&dyn ApprovalHook<FinanceRequest>; 1] = [&SalaryAdvanceHook];
    review(state, state.db().approvals(), actor, id, decision, &hooks).await
}

// =============================================================================
// Leave Requests
// =============================================================================

pub async fn raise_leave(
    state: &AppState,
    actor: &Caller,
    details: LeaveDetails,
) -> ServiceResult<LeaveRequest> {
    raise(state.db().leaves(), actor, details).await
}

pub async fn list_leaves(state: &AppState, actor: &Caller) -> ServiceResult<Vec<LeaveRequest>> {
    let repo = state.db().leaves();
    let fetched = repo.list().await;
    let all = with_snapshot_fallback(state, repo.collection(), fetched).await?;
    Ok(visible_to(all, actor))
}

pub async fn review_leave(
    state: &AppState,
    actor: &Caller,
    id: &str,
    decision: Decision,
) -> ServiceResult<LeaveRequest> {
    review(state, state.db().leaves(), actor, id, decision, &[]).await
}

// =============================================================================
// Shared Review Path
// =============================================================================

async fn raise<P: RequestPayload + 'static>(
    repo: RequestRepository<P>,
    actor: &Caller,
    payload: P,
) -> ServiceResult<ReviewableRequest<P>> {
    let request = ReviewableRequest::open(generate_id(), payload, actor, Utc::now())?;
    repo.insert(&request).await?;

    info!(kind = P::KIND, id = %request.id, by = %request.created_by_name, "Request raised");
    Ok(request)
}

async fn review<P: RequestPayload + 'static>(
    state: &AppState,
    repo: RequestRepository<P>,
    actor: &Caller,
    id: &str,
    decision: Decision,
    hooks: &[&dyn ApprovalHook<P>],
) -> ServiceResult<ReviewableRequest<P>> {
    let mut request = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(P::KIND, id))?;

    let transition = request.review(decision, actor, Utc::now())?;

    let mut batch = state.db().begin_batch().await?;
    repo.save_review_in(&mut batch, &request).await?;

    if transition.is_approval() {
        for hook in hooks {
            if let Err(e) = hook.on_approved(&request, actor, &mut batch).await {
                error!(
                    kind = P::KIND,
                    id = %request.id,
                    hook = hook.name(),
                    error = %e,
                    "Post-approval hook failed, review rolled back"
                );
                if let Err(rb) = batch.rollback().await {
                    error!(id = %request.id, error = %rb, "Rollback failed");
                }
                return Err(ServiceError::Inconsistency(format!(
                    "{} {} could not be completed: {}",
                    P::KIND,
                    request.id,
                    e
                )));
            }
        }
    }

    batch.commit().await?;

    info!(
        kind = P::KIND,
        id = %request.id,
        from = %transition.from,
        to = %transition.to,
        by = %actor.display_name(),
        "Request reviewed"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::staff::{add_staff, delete_staff, NewStaff};
    use crate::testing::{actor, test_state};
    use chrono::NaiveDate;
    use pumpdesk_core::{ApprovalCategory, LeaveType, Money, RequestStatus, Role};

    async fn hire(state: &AppState) -> String {
        let input = NewStaff {
            name: "Ravi".to_string(),
            role: "Attendant".to_string(),
            email: String::new(),
            monthly_salary: Money::from_rupees(15_000),
        };
        add_staff(state, &actor(Role::Admin), input).await.unwrap().id
    }

    fn advance_for(staff_id: &str, rupees: i64) -> FinanceRequest {
        let staff = StaffRef {
            id: staff_id.to_string(),
            name: String::new(),
        };
        FinanceRequest::staff_advance(staff, Money::from_rupees(rupees), "Festival advance")
    }

    #[tokio::test]
    async fn test_raise_fills_staff_name() {
        let (_dir, state) = test_state().await;
        let staff_id = hire(&state).await;

        let ticket = raise_approval(&state, &actor(Role::Manager), advance_for(&staff_id, 2_000))
            .await
            .unwrap();
        assert_eq!(ticket.status, RequestStatus::Pending);
        assert_eq!(ticket.payload.advance_target().unwrap().name, "Ravi");
    }

    #[tokio::test]
    async fn test_admin_cannot_raise_and_manager_cannot_review() {
        let (_dir, state) = test_state().await;
        let request = FinanceRequest::general(Money::from_rupees(800), ApprovalCategory::Maintenance, "Nozzle");

        assert!(matches!(
            raise_approval(&state, &actor(Role::Admin), request.clone()).await,
            Err(ServiceError::PermissionDenied { .. })
        ));

        let ticket = raise_approval(&state, &actor(Role::Manager), request).await.unwrap();
        assert!(matches!(
            review_approval(&state, &actor(Role::Manager), &ticket.id, Decision::Approve).await,
            Err(ServiceError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_hook_leaves_ticket_pending() {
        let (_dir, state) = test_state().await;
        let admin = actor(Role::Admin);
        let staff_id = hire(&state).await;
        let ticket = raise_approval(&state, &actor(Role::Manager), advance_for(&staff_id, 2_000))
            .await
            .unwrap();
        delete_staff(&state, &admin, &staff_id).await.unwrap();

        let err = review_approval(&state, &admin, &ticket.id, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Inconsistency(_)));

        let stored = state.db().approvals().get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert!(state.db().expenses().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_leave_visibility_and_review() {
        let (_dir, state) = test_state().await;
        let details = LeaveDetails {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            leave_type: LeaveType::Casual,
            reason: "Wedding".to_string(),
        };
        let employee = actor(Role::Employee);
        let leave = raise_leave(&state, &employee, details).await.unwrap();

        assert_eq!(list_leaves(&state, &employee).await.unwrap().len(), 1);
        assert!(list_leaves(&state, &actor(Role::Manager)).await.unwrap().is_empty());

        let reviewed = review_leave(&state, &actor(Role::Admin), &leave.id, Decision::Reject)
            .await
            .unwrap();
        assert_eq!(reviewed.status, RequestStatus::Rejected);
        assert!(matches!(
            review_leave(&state, &actor(Role::Admin), &leave.id, Decision::Approve).await,
            Err(ServiceError::Conflict(_))
        ));
    }
}
