//! # Reviewable Requests
//!
//! One state machine for every "someone asks, an admin decides" workflow:
//! finance approval tickets and leave requests.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reviewable Request Lifecycle                         │
//! │                                                                         │
//! │   open() by manager / employee                                          │
//! │        │   payload validated, identity stamped from the Actor           │
//! │        ▼                                                                │
//! │   ┌─────────┐   review(Approve) by admin    ┌──────────┐                │
//! │   │ Pending │ ─────────────────────────────►│ Approved │ (terminal)     │
//! │   └─────────┘                               └──────────┘                │
//! │        │        review(Reject) by admin     ┌──────────┐                │
//! │        └───────────────────────────────────►│ Rejected │ (terminal)     │
//! │                                             └──────────┘                │
//! │                                                                         │
//! │   No reopening. A second review of the same request fails with          │
//! │   AlreadyReviewed and leaves the record untouched.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The request type is generic over its payload. What happens *after* an
//! approval (the salary-advance bookkeeping) is a hook owned by the service
//! layer; this module only decides whether a transition is legal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::access::{Actor, Role};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::StaffRef;
use crate::validation::{validate_date_range, validate_positive, validate_required_text};

// =============================================================================
// Status & Decision
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => f.write_str("Pending"),
            RequestStatus::Approved => f.write_str("Approved"),
            RequestStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

/// An admin's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// A committed status change, returned by [`ReviewableRequest::review`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

impl Transition {
    pub fn is_approval(&self) -> bool {
        self.to == RequestStatus::Approved
    }
}

// =============================================================================
// Payload Trait
// =============================================================================

/// What a request asks for.
pub trait RequestPayload: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync {
    /// Collection / log label ("approval", "leave").
    const KIND: &'static str;

    /// Client-side validation contract: runs before any write.
    fn validate(&self) -> Result<(), ValidationError>;
}

// =============================================================================
// Reviewable Request
// =============================================================================

/// A request moving through `Pending → Approved | Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReviewableRequest<P> {
    pub id: String,
    pub payload: P,
    pub status: RequestStatus,
    pub created_by_uid: String,
    pub created_by_name: String,
    pub created_by_role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub action_by: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub action_at: Option<DateTime<Utc>>,
}

impl<P: RequestPayload> ReviewableRequest<P> {
    /// Opens a new `Pending` request on behalf of `requester`.
    ///
    /// ## Rules
    /// - Only managers and employees raise requests
    /// - The payload must validate
    /// - `created_by_*` come from the verified actor, never from the payload
    pub fn open(id: String, payload: P, requester: &Actor, now: DateTime<Utc>) -> CoreResult<Self> {
        requester.require(
            &[Role::Manager, Role::Employee],
            &format!("raise {} requests", P::KIND),
        )?;
        payload.validate()?;

        Ok(ReviewableRequest {
            id,
            payload,
            status: RequestStatus::Pending,
            created_by_uid: requester.uid.clone(),
            created_by_name: requester.display_name().to_string(),
            created_by_role: requester.role,
            created_at: now,
            action_by: None,
            action_at: None,
        })
    }

    /// Applies an admin decision.
    ///
    /// Fails without touching `self` if the actor is not an admin or the
    /// request is already terminal.
    pub fn review(
        &mut self,
        decision: Decision,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        actor.require_admin(&format!("review {} requests", P::KIND))?;

        if self.status.is_terminal() {
            return Err(CoreError::AlreadyReviewed {
                id: self.id.clone(),
                status: self.status,
            });
        }

        let transition = Transition {
            from: self.status,
            to: decision.target(),
        };
        self.status = transition.to;
        self.action_by = Some(actor.display_name().to_string());
        self.action_at = Some(now);

        Ok(transition)
    }

    /// Admins see every request; everyone else sees their own.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.is_admin() || self.created_by_uid == actor.uid
    }
}

/// Read-side visibility filter, applied whenever a list is rendered or
/// exported.
pub fn visible_to<P: RequestPayload>(
    requests: Vec<ReviewableRequest<P>>,
    actor: &Actor,
) -> Vec<ReviewableRequest<P>> {
    requests
        .into_iter()
        .filter(|r| r.is_visible_to(actor))
        .collect()
}

// =============================================================================
// Finance Approval Tickets
// =============================================================================

/// Spending bucket shown on a ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ApprovalCategory {
    #[default]
    Operational,
    Maintenance,
    #[serde(rename = "Salary/Wages")]
    SalaryWages,
    Inventory,
    Other,
}

/// Whether a ticket is plain spending or a salary advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceKind {
    General,
    StaffAdvance { staff: StaffRef },
}

/// Payload of a finance approval ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinanceRequest {
    pub kind: FinanceKind,
    pub amount: Money,
    #[serde(default)]
    pub category: ApprovalCategory,
    pub description: String,
}

impl FinanceRequest {
    pub fn general(amount: Money, category: ApprovalCategory, description: impl Into<String>) -> Self {
        FinanceRequest {
            kind: FinanceKind::General,
            amount,
            category,
            description: description.into(),
        }
    }

    pub fn staff_advance(staff: StaffRef, amount: Money, description: impl Into<String>) -> Self {
        FinanceRequest {
            kind: FinanceKind::StaffAdvance { staff },
            amount,
            category: ApprovalCategory::SalaryWages,
            description: description.into(),
        }
    }

    /// The staff member an approved ticket pays out to, if any.
    pub fn advance_target(&self) -> Option<&StaffRef> {
        match &self.kind {
            FinanceKind::StaffAdvance { staff } => Some(staff),
            FinanceKind::General => None,
        }
    }
}

impl RequestPayload for FinanceRequest {
    const KIND: &'static str = "approval";

    fn validate(&self) -> Result<(), ValidationError> {
        validate_positive("amount", self.amount.paise())?;
        validate_required_text("description", &self.description)?;
        if let FinanceKind::StaffAdvance { staff } = &self.kind {
            validate_required_text("staff", &staff.id)?;
        }
        Ok(())
    }
}

/// A finance approval ticket.
pub type ApprovalTicket = ReviewableRequest<FinanceRequest>;

// =============================================================================
// Leave Requests
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum LeaveType {
    #[default]
    #[serde(rename = "Sick Leave")]
    Sick,
    #[serde(rename = "Casual Leave")]
    Casual,
    #[serde(rename = "Emergency Leave")]
    Emergency,
    Vacation,
    Other,
}

/// Payload of a leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaveDetails {
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub leave_type: LeaveType,
    pub reason: String,
}

impl LeaveDetails {
    /// Number of calendar days covered, both ends inclusive.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

impl RequestPayload for LeaveDetails {
    const KIND: &'static str = "leave";

    fn validate(&self) -> Result<(), ValidationError> {
        validate_required_text("reason", &self.reason)?;
        validate_date_range("end_date", self.start_date, self.end_date)
    }
}

/// A leave request.
pub type LeaveRequest = ReviewableRequest<LeaveDetails>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(uid: &str, role: Role) -> Actor {
        Actor {
            uid: uid.to_string(),
            email: format!("{}@station.test", uid),
            name: uid.to_uppercase(),
            role,
        }
    }

    fn ticket(requester: &Actor) -> ApprovalTicket {
        let payload = FinanceRequest::general(
            Money::from_rupees(1_500),
            ApprovalCategory::Maintenance,
            "Nozzle replacement",
        );
        ApprovalTicket::open("t1".to_string(), payload, requester, Utc::now()).unwrap()
    }

    #[test]
    fn test_open_stamps_identity_from_actor() {
        let manager = actor("m1", Role::Manager);
        let t = ticket(&manager);
        assert_eq!(t.status, RequestStatus::Pending);
        assert_eq!(t.created_by_uid, "m1");
        assert_eq!(t.created_by_name, "M1");
        assert_eq!(t.created_by_role, Role::Manager);
        assert!(t.action_by.is_none());
    }

    #[test]
    fn test_admin_cannot_open() {
        let admin = actor("a1", Role::Admin);
        let payload = FinanceRequest::general(Money::from_rupees(10), ApprovalCategory::Other, "x");
        let err = ApprovalTicket::open("t".to_string(), payload, &admin, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { .. }));
    }

    #[test]
    fn test_open_rejects_invalid_payloads() {
        let employee = actor("e1", Role::Employee);

        let zero = FinanceRequest::general(Money::zero(), ApprovalCategory::Other, "x");
        assert!(matches!(
            ApprovalTicket::open("t".into(), zero, &employee, Utc::now()),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let blank = FinanceRequest::general(Money::from_rupees(5), ApprovalCategory::Other, "  ");
        assert!(matches!(
            ApprovalTicket::open("t".into(), blank, &employee, Utc::now()),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let no_staff = FinanceRequest::staff_advance(
            StaffRef {
                id: String::new(),
                name: String::new(),
            },
            Money::from_rupees(5),
            "advance",
        );
        assert!(matches!(
            ApprovalTicket::open("t".into(), no_staff, &employee, Utc::now()),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_admin_approval_is_one_way() {
        let mut t = ticket(&actor("m1", Role::Manager));
        let admin = actor("a1", Role::Admin);

        let transition = t.review(Decision::Approve, &admin, Utc::now()).unwrap();
        assert!(transition.is_approval());
        assert_eq!(t.status, RequestStatus::Approved);
        assert_eq!(t.action_by.as_deref(), Some("A1"));

        let before = t.clone();
        for decision in [Decision::Approve, Decision::Reject] {
            let err = t.review(decision, &admin, Utc::now()).unwrap_err();
            assert!(matches!(err, CoreError::AlreadyReviewed { .. }));
        }
        assert_eq!(t, before);
    }

    #[test]
    fn test_rejected_is_terminal() {
        let mut t = ticket(&actor("m1", Role::Manager));
        let admin = actor("a1", Role::Admin);
        t.review(Decision::Reject, &admin, Utc::now()).unwrap();
        assert!(t.review(Decision::Approve, &admin, Utc::now()).is_err());
        assert_eq!(t.status, RequestStatus::Rejected);
    }

    #[test]
    fn test_non_admin_review_is_denied() {
        let mut t = ticket(&actor("m1", Role::Manager));
        for role in [Role::Manager, Role::Employee] {
            let err = t
                .review(Decision::Approve, &actor("x", role), Utc::now())
                .unwrap_err();
            assert!(matches!(err, CoreError::PermissionDenied { .. }));
        }
        assert_eq!(t.status, RequestStatus::Pending);
        assert!(t.action_at.is_none());
    }

    #[test]
    fn test_visibility_filter() {
        let m1 = actor("m1", Role::Manager);
        let m2 = actor("m2", Role::Manager);
        let list = vec![ticket(&m1), ticket(&m2)];

        assert_eq!(visible_to(list.clone(), &actor("a", Role::Admin)).len(), 2);
        let own = visible_to(list, &m1);
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].created_by_uid, "m1");
    }

    #[test]
    fn test_leave_dates_must_be_ordered() {
        let employee = actor("e1", Role::Employee);
        let details = LeaveDetails {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            leave_type: LeaveType::Casual,
            reason: "Wedding".to_string(),
        };
        let err = LeaveRequest::open("l1".into(), details, &employee, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_leave_days_inclusive() {
        let details = LeaveDetails {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            leave_type: LeaveType::Sick,
            reason: "Fever".to_string(),
        };
        assert_eq!(details.days(), 3);
    }

    #[test]
    fn test_finance_kind_wire_format() {
        let payload = FinanceRequest::staff_advance(
            StaffRef {
                id: "s1".to_string(),
                name: "Ravi".to_string(),
            },
            Money::from_rupees(2_000),
            "Advance",
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"]["type"], "STAFF_ADVANCE");
        assert_eq!(json["category"], "Salary/Wages");
    }
}
