//! Daily attendance marks.

use chrono::{NaiveDate, Utc};
use tracing::info;

use pumpdesk_core::ledger::{compute_attendance_stats, AttendanceStats};
use pumpdesk_core::{AttendanceMark, AttendanceStatus};

use crate::error::{ServiceError, ServiceResult};
use crate::identity::Caller;
use crate::state::AppState;

/// Sets one member's status for `date`, replacing any earlier mark.
pub async fn mark_attendance(
    state: &AppState,
    actor: &Caller,
    staff_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
) -> ServiceResult<AttendanceMark> {
    actor.require_operator("mark attendance")?;

    if state.db().staff().get_by_id(staff_id).await?.is_none() {
        return Err(ServiceError::not_found("Staff", staff_id));
    }

    let mark = AttendanceMark {
        date,
        staff_id: staff_id.to_string(),
        status,
        marked_by: actor.display_name().to_string(),
        marked_at: Utc::now(),
    };
    state.db().attendance().mark(&mark).await?;
    Ok(mark)
}

/// Marks everyone on the roster present for `date` in a single write.
pub async fn mark_all_present(
    state: &AppState,
    actor: &Caller,
    date: NaiveDate,
) -> ServiceResult<usize> {
    actor.require_operator("mark attendance")?;

    let staff = state.db().staff().list().await?;
    let now = Utc::now();
    let marks: Vec<AttendanceMark> = staff
        .iter()
        .map(|member| AttendanceMark {
            date,
            staff_id: member.id.clone(),
            status: AttendanceStatus::Present,
            marked_by: actor.display_name().to_string(),
            marked_at: now,
        })
        .collect();

    state.db().attendance().mark_all(&marks).await?;
    info!(date = %date, count = marks.len(), by = %actor.display_name(), "All staff marked present");
    Ok(marks.len())
}

pub async fn attendance_for_date(
    state: &AppState,
    _actor: &Caller,
    date: NaiveDate,
) -> ServiceResult<Vec<AttendanceMark>> {
    Ok(state.db().attendance().list_for_date(date).await?)
}

pub async fn attendance_stats(
    state: &AppState,
    actor: &Caller,
    date: NaiveDate,
) -> ServiceResult<AttendanceStats> {
    let staff = state.db().staff().list().await?;
    let marks = attendance_for_date(state, actor, date).await?;
    Ok(compute_attendance_stats(&staff, &marks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::staff::{add_staff, NewStaff};
    use crate::testing::{actor, test_state};
    use pumpdesk_core::{Money, Role};

    async fn hire(state: &AppState, name: &str) -> String {
        let input = NewStaff {
            name: name.to_string(),
            role: "Attendant".to_string(),
            email: String::new(),
            monthly_salary: Money::from_rupees(12_000),
        };
        add_staff(state, &actor(Role::Manager), input).await.unwrap().id
    }

    #[tokio::test]
    async fn test_stats_after_marks() {
        let (_dir, state) = test_state().await;
        let manager = actor(Role::Manager);
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let ravi = hire(&state, "Ravi").await;
        let sunil = hire(&state, "Sunil").await;
        hire(&state, "Ajay").await;

        mark_attendance(&state, &manager, &ravi, day, AttendanceStatus::Present).await.unwrap();
        mark_attendance(&state, &manager, &sunil, day, AttendanceStatus::Absent).await.unwrap();

        let stats = attendance_stats(&state, &manager, day).await.unwrap();
        assert_eq!((stats.present, stats.absent, stats.unmarked), (1, 1, 1));
        assert_eq!(stats.percentage, 33);
    }

    #[tokio::test]
    async fn test_mark_all_present_overrides_absent() {
        let (_dir, state) = test_state().await;
        let manager = actor(Role::Manager);
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let ravi = hire(&state, "Ravi").await;
        hire(&state, "Sunil").await;
        mark_attendance(&state, &manager, &ravi, day, AttendanceStatus::Absent).await.unwrap();

        assert_eq!(mark_all_present(&state, &manager, day).await.unwrap(), 2);

        let stats = attendance_stats(&state, &manager, day).await.unwrap();
        assert_eq!(stats.present, 2);
        assert_eq!(stats.percentage, 100);
    }

    #[tokio::test]
    async fn test_employee_cannot_mark() {
        let (_dir, state) = test_state().await;
        let ravi = hire(&state, "Ravi").await;
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let err = mark_attendance(&state, &actor(Role::Employee), &ravi, day, AttendanceStatus::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { .. }));
    }
}
