//! # Live Dashboard
//!
//! Keeps the station overview current while it is open.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  readings ─┐                                                            │
//! │  intakes ──┤                                                            │
//! │  khata ────┤  Subscription<T>   ┌──────────────┐   watch::Sender        │
//! │  expenses ─┼──────────────────► │ refresh task │ ─────────────────► UI  │
//! │  staff ────┤  (full result set) │  recompute   │   Option<DashboardView>│
//! │  attendance┘                    └──────────────┘                        │
//! │                                                                         │
//! │  Nothing is published until every feed has delivered once.              │
//! │  close(): stops the task, which drops all six subscriptions.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ts_rs::TS;

use pumpdesk_core::ledger::{
    compute_attendance_stats, compute_dashboard_metrics, AttendanceStats, DashboardInput,
    DashboardMetrics, TankCapacities,
};
use pumpdesk_core::{AttendanceMark, Expense, FuelIntake, Reading, StaffMember, Transaction};
use pumpdesk_db::{Collection, DbResult, Subscription};

use crate::state::AppState;

/// What the overview screen renders.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct DashboardView {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub metrics: DashboardMetrics,
    pub attendance: AttendanceStats,
}

struct Feeds {
    readings: Subscription<Reading>,
    intakes: Subscription<FuelIntake>,
    transactions: Subscription<Transaction>,
    expenses: Subscription<Expense>,
    staff: Subscription<StaffMember>,
    attendance: Subscription<AttendanceMark>,
}

#[derive(Default)]
struct Latest {
    readings: Option<Vec<Reading>>,
    intakes: Option<Vec<FuelIntake>>,
    transactions: Option<Vec<Transaction>>,
    expenses: Option<Vec<Expense>>,
    staff: Option<Vec<StaffMember>>,
    attendance: Option<Vec<AttendanceMark>>,
}

impl Latest {
    fn view(&self, capacities: TankCapacities, date: NaiveDate) -> Option<DashboardView> {
        let input = DashboardInput {
            readings: self.readings.as_deref()?,
            intakes: self.intakes.as_deref()?,
            transactions: self.transactions.as_deref()?,
            expenses: self.expenses.as_deref()?,
            capacities,
        };
        let attendance = compute_attendance_stats(self.staff.as_deref()?, self.attendance.as_deref()?);

        Some(DashboardView {
            date,
            metrics: compute_dashboard_metrics(&input, date),
            attendance,
        })
    }
}

pub struct LiveDashboard {
    view: watch::Receiver<Option<DashboardView>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LiveDashboard {
    /// Subscribes to every collection the overview folds over. Attendance
    /// is tracked for `date`.
    pub fn open(state: &AppState, date: NaiveDate) -> Self {
        let db = state.db();
        let feeds = Feeds {
            readings: db.readings().subscribe(),
            intakes: db.intakes().subscribe(),
            transactions: db.transactions().subscribe(),
            expenses: db.expenses().subscribe(),
            staff: db.staff().subscribe(),
            attendance: db.attendance().subscribe_for_date(date),
        };

        let (tx, rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(refresh_loop(feeds, state.capacities(), date, tx, shutdown_rx));

        info!(date = %date, "Live dashboard opened");
        LiveDashboard {
            view: rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// The latest view, then every recomputation.
    pub fn subscribe(&self) -> watch::Receiver<Option<DashboardView>> {
        self.view.clone()
    }

    pub fn current(&self) -> Option<DashboardView> {
        self.view.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_none()
    }

    /// Tears down every subscription. Later calls do nothing.
    pub async fn close(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(());

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Dashboard task ended abnormally");
            }
        }
        info!("Live dashboard closed");
    }
}

impl Drop for LiveDashboard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn refresh_loop(
    mut feeds: Feeds,
    capacities: TankCapacities,
    date: NaiveDate,
    tx: watch::Sender<Option<DashboardView>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut latest = Latest::default();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(d) = feeds.readings.next() => keep(&mut latest.readings, d, Collection::Readings),
            Some(d) = feeds.intakes.next() => keep(&mut latest.intakes, d, Collection::FuelIntakes),
            Some(d) = feeds.transactions.next() => keep(&mut latest.transactions, d, Collection::Transactions),
            Some(d) = feeds.expenses.next() => keep(&mut latest.expenses, d, Collection::Expenses),
            Some(d) = feeds.staff.next() => keep(&mut latest.staff, d, Collection::Staff),
            Some(d) = feeds.attendance.next() => keep(&mut latest.attendance, d, Collection::Attendance),
            else => break,
        }

        if let Some(view) = latest.view(capacities, date) {
            tx.send_replace(Some(view));
        }
    }

    debug!("Dashboard refresh loop finished");
}

fn keep<T>(slot: &mut Option<Vec<T>>, delivery: DbResult<Vec<T>>, collection: Collection) {
    match delivery {
        Ok(records) => *slot = Some(records),
        Err(e) => warn!(collection = %collection, error = %e, "Live query failed, keeping last result"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::expenses::{add_expense, NewExpense};
    use crate::testing::{actor, test_state};
    use pumpdesk_core::{Money, Role};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next_view(
        rx: &mut watch::Receiver<Option<DashboardView>>,
        accept: impl Fn(&DashboardView) -> bool,
    ) -> DashboardView {
        timeout(Duration::from_secs(5), async {
            loop {
                if let Some(view) = rx.borrow_and_update().clone() {
                    if accept(&view) {
                        return view;
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_recomputes_after_write_and_stops_after_close() {
        let (_dir, state) = test_state().await;
        let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let mut dashboard = LiveDashboard::open(&state, day);
        let mut rx = dashboard.subscribe();

        let first = next_view(&mut rx, |_| true).await;
        assert_eq!(first.metrics.monthly_expenses, Money::zero());
        assert_eq!(first.attendance.total, 0);

        let input = NewExpense {
            description: "Electricity".to_string(),
            amount: Money::from_rupees(4_000),
            date: day,
            receipt_ref: None,
        };
        add_expense(&state, &actor(Role::Manager), input).await.unwrap();

        let updated = next_view(&mut rx, |v| v.metrics.monthly_expenses.is_positive()).await;
        assert_eq!(updated.metrics.monthly_expenses, Money::from_rupees(4_000));

        dashboard.close().await;
        assert!(dashboard.is_closed());
        let publisher_gone = timeout(Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(publisher_gone.is_ok());

        dashboard.close().await;
    }
}
