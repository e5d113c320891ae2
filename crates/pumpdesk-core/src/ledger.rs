//! # Ledger Aggregation Engine
//!
//! Pure functions that fold record collections into the derived views the
//! back office shows: tank stock, reading totals, customer dues, staff
//! payable, attendance and expense totals.
//!
//! ## Recompute, Never Patch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  store change ──► full result set ──► compute_*() ──► view              │
//! │       ▲                                    │                            │
//! │       │              no derived value is   │                            │
//! │       └──── write ◄── ever written back ◄──┘                            │
//! │                                                                         │
//! │  Tank stock     = Σ intake(fuel) − Σ reading.usage(fuel)   (signed)     │
//! │  Customer due   = Σ FUEL − Σ PAYMENT                       (signed)     │
//! │  Staff payable  = monthly_salary − advance_taken           (signed)     │
//! │  Pump usage     = max(0, closing − opening)                             │
//! │  Revenue        = petrol_price × petrol + diesel_price × diesel         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is deterministic: same records in, same view out.
//! Subscriptions and storage live elsewhere and hand plain slices in.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use ts_rs::TS;

use crate::money::{Money, Volume};
use crate::types::{
    AttendanceMark, AttendanceStatus, Expense, ExpenseKind, FuelIntake, FuelPrices, FuelType, Pump,
    PumpEntry, PumpReading, Reading, ReadingDraft, StaffMember, Transaction, TransactionKind,
};

// =============================================================================
// Tank Stock
// =============================================================================

/// Physical tank sizes. Configuration, not derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TankCapacities {
    pub petrol: Volume,
    pub diesel: Volume,
}

impl Default for TankCapacities {
    fn default() -> Self {
        TankCapacities {
            petrol: Volume::from_litres(15_000),
            diesel: Volume::from_litres(20_000),
        }
    }
}

/// Stock of one tank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TankLevel {
    /// Signed. A deficit means usage was recorded before the matching intake.
    pub current: Volume,
    pub capacity: Volume,
    /// Fill level for display: clamped to `[0, 100]`, one decimal.
    pub percentage: f64,
}

impl TankLevel {
    fn new(current: Volume, capacity: Volume) -> Self {
        TankLevel {
            current,
            capacity,
            percentage: fill_percentage(current, capacity),
        }
    }

    pub fn is_deficit(&self) -> bool {
        self.current.is_negative()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TankStats {
    pub petrol: TankLevel,
    pub diesel: TankLevel,
}

/// Derives tank stock from the full intake and reading history.
///
/// Tanks start empty; stock is only ever what was delivered minus what
/// was sold.
///
/// ```rust
/// use pumpdesk_core::ledger::{compute_tank_stats, TankCapacities};
///
/// let stats = compute_tank_stats(&[], &[], &TankCapacities::default());
/// assert_eq!(stats.petrol.current.millilitres(), 0);
/// assert_eq!(stats.petrol.percentage, 0.0);
/// ```
pub fn compute_tank_stats(
    intakes: &[FuelIntake],
    readings: &[Reading],
    capacities: &TankCapacities,
) -> TankStats {
    let stock = |fuel_type: FuelType| -> Volume {
        let delivered: Volume = intakes
            .iter()
            .filter(|i| i.fuel_type == fuel_type)
            .map(|i| i.amount)
            .sum();
        let sold: Volume = readings.iter().map(|r| r.usage_for(fuel_type)).sum();
        delivered - sold
    };

    TankStats {
        petrol: TankLevel::new(stock(FuelType::Petrol), capacities.petrol),
        diesel: TankLevel::new(stock(FuelType::Diesel), capacities.diesel),
    }
}

fn fill_percentage(current: Volume, capacity: Volume) -> f64 {
    if capacity.millilitres() <= 0 {
        return 0.0;
    }
    let raw = current.millilitres() as f64 / capacity.millilitres() as f64 * 100.0;
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

// =============================================================================
// Reading Totals
// =============================================================================

/// Per-date totals derived from pump entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReadingTotals {
    pub total_petrol: Volume,
    pub total_diesel: Volume,
    pub total_usage: Volume,
    pub total_revenue: Money,
}

/// Joins entries to the pump table. Entries for unknown pumps are dropped.
pub fn enrich_entries(entries: &[PumpEntry], pumps: &[Pump]) -> Vec<PumpReading> {
    entries
        .iter()
        .filter_map(|entry| {
            let Some(pump) = pumps.iter().find(|p| p.id == entry.pump_id) else {
                warn!(pump_id = entry.pump_id, "Ignoring reading entry for unknown pump");
                return None;
            };
            Some(PumpReading {
                pump_id: pump.id,
                pump_name: pump.name.clone(),
                fuel_type: pump.fuel_type,
                opening: entry.opening,
                closing: entry.closing,
                usage: entry.closing.dispensed_since(entry.opening),
                image_ref: entry.image_ref.clone(),
            })
        })
        .collect()
}

/// Sums usage by fuel and prices it.
///
/// Revenue is priced per fuel total, so `total_revenue` is always exactly
/// `petrol_price × total_petrol + diesel_price × total_diesel` at paisa
/// precision.
pub fn compute_reading_totals(
    entries: &[PumpEntry],
    pumps: &[Pump],
    prices: &FuelPrices,
) -> ReadingTotals {
    totals_from_lines(&enrich_entries(entries, pumps), prices)
}

fn totals_from_lines(lines: &[PumpReading], prices: &FuelPrices) -> ReadingTotals {
    let usage_of = |fuel_type: FuelType| -> Volume {
        lines
            .iter()
            .filter(|l| l.fuel_type == fuel_type)
            .map(|l| l.closing.dispensed_since(l.opening))
            .sum()
    };

    let total_petrol = usage_of(FuelType::Petrol);
    let total_diesel = usage_of(FuelType::Diesel);

    ReadingTotals {
        total_petrol,
        total_diesel,
        total_usage: total_petrol + total_diesel,
        total_revenue: prices.petrol.for_volume(total_petrol)
            + prices.diesel.for_volume(total_diesel),
    }
}

/// Assembles the stored record for a reading form submission.
///
/// `created_at` is carried over when an existing reading for the same date
/// is being replaced.
pub fn build_reading(
    id: String,
    draft: &ReadingDraft,
    pumps: &[Pump],
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Reading {
    let lines = enrich_entries(&draft.entries, pumps);
    let totals = totals_from_lines(&lines, &draft.prices);

    Reading {
        id,
        date: draft.date,
        pumps: lines,
        petrol_price: draft.prices.petrol,
        diesel_price: draft.prices.diesel,
        total_petrol: totals.total_petrol,
        total_diesel: totals.total_diesel,
        total_usage: totals.total_usage,
        total_revenue: totals.total_revenue,
        created_at,
        updated_at: now,
    }
}

/// Keyed point lookup of the reading for `date`.
///
/// Two readings for one date should never exist. If the store hands back
/// more than one, the most recently updated wins (then most recently
/// created) and a consistency event is logged.
pub fn select_reading_for_date(readings: &[Reading], date: NaiveDate) -> Option<&Reading> {
    let matches: Vec<&Reading> = readings.iter().filter(|r| r.date == date).collect();

    if matches.len() > 1 {
        warn!(
            %date,
            count = matches.len(),
            ids = ?matches.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            "Multiple readings stored for one date; using the most recent"
        );
    }

    matches
        .into_iter()
        .max_by_key(|r| (r.updated_at, r.created_at))
}

// =============================================================================
// Khata
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerBalance {
    pub total_fuel: Money,
    pub total_paid: Money,
    /// Signed. Negative means the customer is in credit.
    pub due: Money,
}

/// Folds one customer's transactions into a balance.
pub fn compute_customer_balance(transactions: &[Transaction]) -> CustomerBalance {
    let mut balance = CustomerBalance::default();

    for tx in transactions {
        match tx.kind {
            TransactionKind::Fuel => balance.total_fuel += tx.amount,
            TransactionKind::Payment => balance.total_paid += tx.amount,
        }
    }

    balance.due = balance.total_fuel - balance.total_paid;
    balance
}

/// Net amount owed to the station across every customer.
pub fn compute_total_dues(transactions: &[Transaction]) -> Money {
    compute_customer_balance(transactions).due
}

// =============================================================================
// Payroll
// =============================================================================

/// Net payable for a staff member, recomputed from primitives.
///
/// The cached `payable_salary` is never trusted; a disagreeing cache is
/// logged so the stale row can be found.
pub fn compute_staff_payable(staff: &StaffMember) -> Money {
    let payable = staff.recomputed_payable();

    if let Some(cached) = staff.payable_salary {
        if cached != payable {
            warn!(
                staff_id = %staff.id,
                cached = %cached,
                recomputed = %payable,
                "Stale cached payable salary"
            );
        }
    }

    payable
}

/// Total of salary-advance expenses recorded against one staff member.
///
/// Should equal that member's `advance_taken`; used to audit the pair.
pub fn compute_staff_advances(expenses: &[Expense], staff_id: &str) -> Money {
    expenses
        .iter()
        .filter(|e| e.kind == ExpenseKind::SalaryAdvance && e.staff_id.as_deref() == Some(staff_id))
        .map(|e| e.amount)
        .sum()
}

/// Sum of expenses dated within the given calendar month. Both kinds count.
pub fn compute_monthly_expense_total(expenses: &[Expense], year: i32, month: u32) -> Money {
    expenses
        .iter()
        .filter(|e| e.date.year() == year && e.date.month() == month)
        .map(|e| e.amount)
        .sum()
}

// =============================================================================
// Attendance
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AttendanceStats {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub unmarked: u32,
    /// `round(present / total × 100)`, 0 when there is no staff.
    pub percentage: u8,
}

/// Attendance summary for one date.
///
/// `marks` should all share a date. Marks for staff not in `staff` are
/// ignored, so `present + absent + unmarked == total` always holds.
pub fn compute_attendance_stats(staff: &[StaffMember], marks: &[AttendanceMark]) -> AttendanceStats {
    let by_staff: HashMap<&str, AttendanceStatus> = marks
        .iter()
        .map(|m| (m.staff_id.as_str(), m.status))
        .collect();

    let mut stats = AttendanceStats {
        total: staff.len() as u32,
        ..AttendanceStats::default()
    };

    for member in staff {
        match by_staff.get(member.id.as_str()) {
            Some(AttendanceStatus::Present) => stats.present += 1,
            Some(AttendanceStatus::Absent) => stats.absent += 1,
            None => stats.unmarked += 1,
        }
    }

    if stats.total > 0 {
        stats.percentage = (stats.present as f64 / stats.total as f64 * 100.0).round() as u8;
    }

    stats
}

// =============================================================================
// Dashboard
// =============================================================================

/// Record collections the dashboard folds over.
#[derive(Debug, Clone, Copy)]
pub struct DashboardInput<'a> {
    pub readings: &'a [Reading],
    pub intakes: &'a [FuelIntake],
    pub transactions: &'a [Transaction],
    pub expenses: &'a [Expense],
    pub capacities: TankCapacities,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardMetrics {
    pub today_usage: Volume,
    pub today_revenue: Money,
    pub total_dues: Money,
    pub monthly_expenses: Money,
    pub tank: TankStats,
}

/// The station overview for `today` (a local calendar date).
pub fn compute_dashboard_metrics(input: &DashboardInput<'_>, today: NaiveDate) -> DashboardMetrics {
    let todays = select_reading_for_date(input.readings, today);

    DashboardMetrics {
        today_usage: todays.map(|r| r.total_usage).unwrap_or_default(),
        today_revenue: todays.map(|r| r.total_revenue).unwrap_or_default(),
        total_dues: compute_total_dues(input.transactions),
        monthly_expenses: compute_monthly_expense_total(input.expenses, today.year(), today.month()),
        tank: compute_tank_stats(input.intakes, input.readings, &input.capacities),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
