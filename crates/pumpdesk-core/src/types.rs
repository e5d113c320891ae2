//! # Domain Types
//!
//! Core domain records kept by the station.
//!
//! ## Record Families
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  FUEL                      KHATA                    PAYROLL             │
//! │  ┌───────────────┐        ┌───────────────┐        ┌───────────────┐   │
//! │  │ Pump (static) │        │ Customer      │        │ StaffMember   │   │
//! │  │ Reading (1/day)│       │ Transaction   │        │ Expense       │   │
//! │  │ FuelIntake    │        │  FUEL/PAYMENT │        │ AttendanceMark│   │
//! │  └───────────────┘        └───────────────┘        └───────────────┘   │
//! │                                                                         │
//! │  Lifecycle:                                                             │
//! │  • Reading      - replace-on-edit, keyed by calendar date               │
//! │  • StaffMember  - advance_taken / payable_salary updated by advances    │
//! │  • Everything else - append-only (create / delete)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dates
//! Business dates (`date` fields) are calendar days, [`NaiveDate`]. Only
//! audit stamps (`created_at`, `updated_at`) carry a time of day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, Volume};

// =============================================================================
// Fuel Type & Pumps
// =============================================================================

/// The two fuels the station sells. Each has its own tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum FuelType {
    Petrol,
    Diesel,
}

impl FuelType {
    pub const ALL: [FuelType; 2] = [FuelType::Petrol, FuelType::Diesel];
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelType::Petrol => f.write_str("Petrol"),
            FuelType::Diesel => f.write_str("Diesel"),
        }
    }
}

/// A dispensing pump. Static configuration, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Pump {
    pub id: u32,
    pub name: String,
    pub fuel_type: FuelType,
}

impl Pump {
    pub fn new(id: u32, name: impl Into<String>, fuel_type: FuelType) -> Self {
        Pump {
            id,
            name: name.into(),
            fuel_type,
        }
    }
}

/// The station's forecourt: two petrol pumps, four diesel pumps.
pub fn default_pumps() -> Vec<Pump> {
    vec![
        Pump::new(1, "Pump 1", FuelType::Petrol),
        Pump::new(2, "Pump 2", FuelType::Petrol),
        Pump::new(3, "Pump 3", FuelType::Diesel),
        Pump::new(4, "Pump 4", FuelType::Diesel),
        Pump::new(5, "Pump 5", FuelType::Diesel),
        Pump::new(6, "Pump 6", FuelType::Diesel),
    ]
}

// =============================================================================
// Readings
// =============================================================================

/// Meter values for one pump as entered on the reading form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PumpEntry {
    pub pump_id: u32,
    #[serde(default)]
    pub opening: Volume,
    #[serde(default)]
    pub closing: Volume,
    /// Opaque reference to a meter photo held by the upload service.
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl PumpEntry {
    pub fn new(pump_id: u32, opening: Volume, closing: Volume) -> Self {
        PumpEntry {
            pump_id,
            opening,
            closing,
            image_ref: None,
        }
    }
}

/// A stored pump line: the entry plus the pump snapshot and derived usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PumpReading {
    pub pump_id: u32,
    pub pump_name: String,
    pub fuel_type: FuelType,
    #[serde(default)]
    pub opening: Volume,
    #[serde(default)]
    pub closing: Volume,
    #[serde(default)]
    pub usage: Volume,
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// Unit prices in effect for a reading date, per litre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FuelPrices {
    #[serde(default)]
    pub petrol: Money,
    #[serde(default)]
    pub diesel: Money,
}

impl FuelPrices {
    pub fn new(petrol: Money, diesel: Money) -> Self {
        FuelPrices { petrol, diesel }
    }

    pub fn for_fuel(&self, fuel_type: FuelType) -> Money {
        match fuel_type {
            FuelType::Petrol => self.petrol,
            FuelType::Diesel => self.diesel,
        }
    }
}

/// The daily meter snapshot. At most one per calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reading {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub pumps: Vec<PumpReading>,
    #[serde(default)]
    pub petrol_price: Money,
    #[serde(default)]
    pub diesel_price: Money,
    #[serde(default)]
    pub total_petrol: Volume,
    #[serde(default)]
    pub total_diesel: Volume,
    #[serde(default)]
    pub total_usage: Volume,
    #[serde(default)]
    pub total_revenue: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Reading-form input: what a manager types for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReadingDraft {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub entries: Vec<PumpEntry>,
    #[serde(default)]
    pub prices: FuelPrices,
}

impl Reading {
    /// Litres sold of one fuel on this date.
    pub fn usage_for(&self, fuel_type: FuelType) -> Volume {
        match fuel_type {
            FuelType::Petrol => self.total_petrol,
            FuelType::Diesel => self.total_diesel,
        }
    }

    pub fn prices(&self) -> FuelPrices {
        FuelPrices::new(self.petrol_price, self.diesel_price)
    }
}

// =============================================================================
// Fuel Intake
// =============================================================================

/// A tanker delivery into one of the tanks. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FuelIntake {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub fuel_type: FuelType,
    #[serde(default)]
    pub amount: Volume,
    #[serde(default)]
    pub invoice_ref: String,
    #[serde(default)]
    pub note: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Khata (customer credit ledger)
// =============================================================================

/// A credit customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Direction of a khata entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Fuel taken on credit. Increases the due.
    Fuel,
    /// Money received. Decreases the due.
    Payment,
}

/// One line in a customer's khata. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub customer_id: String,
    pub kind: TransactionKind,
    #[serde(default)]
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub receipt_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Staff & Expenses
// =============================================================================

/// A staff member on the payroll.
///
/// `payable_salary` is a cache of `monthly_salary - advance_taken`. Readers
/// go through [`crate::ledger::compute_staff_payable`], which recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    /// Job title ("Attendant", "Cashier"), not an access role.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub monthly_salary: Money,
    #[serde(default)]
    pub advance_taken: Money,
    #[serde(default)]
    pub payable_salary: Option<Money>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StaffMember {
    /// `monthly_salary - advance_taken`, from primitives.
    pub fn recomputed_payable(&self) -> Money {
        self.monthly_salary - self.advance_taken
    }

    /// Records an advance against this member and refreshes the cache.
    pub fn apply_advance(&mut self, amount: Money) {
        self.advance_taken += amount;
        self.payable_salary = Some(self.recomputed_payable());
    }
}

/// What an expense row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseKind {
    /// Running cost of the station.
    Expense,
    /// Durable record of a payroll deduction. Always references a staff id.
    SalaryAdvance,
}

/// An outgoing payment. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub kind: ExpenseKind,
    pub description: String,
    #[serde(default)]
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub staff_id: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub receipt_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// The expense row that accompanies a salary advance.
    pub fn salary_advance(
        id: String,
        staff: &StaffRef,
        amount: Money,
        date: NaiveDate,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Expense {
            id,
            kind: ExpenseKind::SalaryAdvance,
            description: format!("Advance to {}", staff.name),
            amount,
            date,
            staff_id: Some(staff.id.clone()),
            created_by: created_by.into(),
            receipt_ref: None,
            created_at: now,
        }
    }
}

/// Staff id plus the name captured when a request referenced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Attendance
// =============================================================================

/// A storable attendance value. "Unmarked" is the absence of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// One staff member's attendance on one date. Keyed by `(date, staff_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AttendanceMark {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub staff_id: String,
    pub status: AttendanceStatus,
    pub marked_by: String,
    #[ts(as = "String")]
    pub marked_at: DateTime<Utc>,
}

// =============================================================================
// User Profiles
// =============================================================================

/// Role profile held by the identity side of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: crate::access::Role,
    /// argon2 PHC string. Never leaves the identity layer.
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
