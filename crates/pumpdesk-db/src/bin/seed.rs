//! # Demo Data Seeder
//!
//! Fills a station database with a few weeks of plausible records.
//!
//! ## Usage
//! ```bash
//! # 14 days of history (default)
//! cargo run -p pumpdesk-db --bin seed
//!
//! # Longer history, custom file
//! cargo run -p pumpdesk-db --bin seed -- --days 45 --db ./data/pumpdesk.db
//! ```
//!
//! ## Generated Records
//! - Staff roster with salaries
//! - Credit customers with fuel and payment lines
//! - One tanker delivery per fuel every seven days
//! - One meter reading per day on the six default pumps
//! - Running expenses and one salary advance
//!
//! Login profiles are not seeded; they need password hashing, which
//! belongs to the backoffice.

use std::env;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, Utc};

use pumpdesk_core::ledger::build_reading;
use pumpdesk_core::{
    default_pumps, Customer, Expense, ExpenseKind, FuelIntake, FuelPrices, FuelType, Money,
    PumpEntry, ReadingDraft, StaffMember, StaffRef, Transaction, TransactionKind, Volume,
};
use pumpdesk_db::{generate_id, Database, DbConfig, ExpenseRepository, StaffRepository};

const STAFF: &[(&str, &str, i64)] = &[
    ("Ravi Kumar", "Attendant", 12_000),
    ("Suresh Yadav", "Attendant", 12_000),
    ("Meena Devi", "Cashier", 15_000),
    ("Anil Sharma", "Supervisor", 20_000),
];

const CUSTOMERS: &[&str] = &[
    "Sharma Transport",
    "Gupta Roadways",
    "Verma Logistics",
    "City Cabs",
];

/// Litres dispensed per pump per day, before the day-of-series wobble.
const BASE_DAILY_LITRES: [i64; 6] = [420, 380, 610, 560, 500, 450];

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 14;
    let mut db_path = String::from("./pumpdesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1]
                        .parse()
                        .with_context(|| format!("invalid --days value: {}", args[i + 1]))?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pumpdesk Demo Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of history to generate (default: 14)");
                println!("  -d, --db <PATH>    Database file path (default: ./pumpdesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Pumpdesk Demo Data Seeder");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;
    println!("✓ Connected, migrations applied");

    if !db.staff().list().await?.is_empty() {
        println!("⚠ Database already has staff records");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let today = Local::now().date_naive();
    let start = today - Duration::days(days.max(1) - 1);

    let staff = seed_staff(&db).await?;
    println!("✓ {} staff members", staff.len());

    let customers = seed_customers(&db, start, days).await?;
    println!("✓ {} customers with khata lines", customers);

    let deliveries = seed_intakes(&db, start, days).await?;
    println!("✓ {} tanker deliveries", deliveries);

    seed_readings(&db, start, days).await?;
    println!("✓ {} daily readings", days);

    seed_expenses(&db, &staff, start, today).await?;
    println!("✓ Expenses and one salary advance");

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

async fn seed_staff(db: &Database) -> Result<Vec<StaffMember>> {
    let mut roster = Vec::with_capacity(STAFF.len());
    for (name, role, salary) in STAFF {
        let salary = Money::from_rupees(*salary);
        let member = StaffMember {
            id: generate_id(),
            name: name.to_string(),
            role: role.to_string(),
            email: format!(
                "{}@station.local",
                name.split_whitespace().next().unwrap_or(name).to_lowercase()
            ),
            monthly_salary: salary,
            advance_taken: Money::zero(),
            payable_salary: Some(salary),
            created_at: Utc::now(),
        };
        db.staff()
            .insert(&member)
            .await
            .with_context(|| format!("inserting staff {}", name))?;
        roster.push(member);
    }
    Ok(roster)
}

async fn seed_customers(db: &Database, start: NaiveDate, days: i64) -> Result<usize> {
    for (idx, name) in CUSTOMERS.iter().enumerate() {
        let customer = Customer {
            id: generate_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        db.customers().insert(&customer).await?;

        let seed = idx as i64 + 1;
        for day in (0..days).step_by(3) {
            let date = start + Duration::days(day);
            let fuel = Transaction {
                id: generate_id(),
                customer_id: customer.id.clone(),
                kind: TransactionKind::Fuel,
                amount: Money::from_rupees(1_500 + seed * 250 + day * 10),
                date,
                note: "Diesel on credit".to_string(),
                receipt_ref: None,
                created_at: Utc::now(),
            };
            db.transactions().insert(&fuel).await?;

            if day % 6 == 0 {
                let payment = Transaction {
                    id: generate_id(),
                    customer_id: customer.id.clone(),
                    kind: TransactionKind::Payment,
                    amount: Money::from_rupees(2_000),
                    date,
                    note: "UPI".to_string(),
                    receipt_ref: None,
                    created_at: Utc::now(),
                };
                db.transactions().insert(&payment).await?;
            }
        }
    }
    Ok(CUSTOMERS.len())
}

async fn seed_intakes(db: &Database, start: NaiveDate, days: i64) -> Result<usize> {
    let mut count = 0;
    for day in (0..days).step_by(7) {
        for (fuel_type, litres) in [(FuelType::Petrol, 12_000), (FuelType::Diesel, 16_000)] {
            let intake = FuelIntake {
                id: generate_id(),
                date: start + Duration::days(day),
                fuel_type,
                amount: Volume::from_litres(litres),
                invoice_ref: format!("INV-{}-{}", fuel_type, day),
                note: None,
                created_by: "seed".to_string(),
                created_at: Utc::now(),
            };
            db.intakes().insert(&intake).await?;
            count += 1;
        }
    }
    Ok(count)
}

async fn seed_readings(db: &Database, start: NaiveDate, days: i64) -> Result<()> {
    let pumps = default_pumps();
    let prices = FuelPrices::new(Money::from_paise(10_472), Money::from_paise(9_262));
    let mut meters: Vec<Volume> = pumps
        .iter()
        .map(|p| Volume::from_litres(100_000 * i64::from(p.id)))
        .collect();

    for day in 0..days {
        let entries: Vec<PumpEntry> = pumps
            .iter()
            .zip(meters.iter_mut())
            .enumerate()
            .map(|(idx, (pump, meter))| {
                let litres = BASE_DAILY_LITRES[idx % BASE_DAILY_LITRES.len()] + (day * 13) % 90;
                let opening = *meter;
                *meter = opening + Volume::from_litres(litres);
                PumpEntry::new(pump.id, opening, *meter)
            })
            .collect();

        let draft = ReadingDraft {
            date: start + Duration::days(day),
            entries,
            prices,
        };
        let now = Utc::now();
        db.readings()
            .upsert(&build_reading(generate_id(), &draft, &pumps, now, now))
            .await?;
    }
    Ok(())
}

async fn seed_expenses(
    db: &Database,
    staff: &[StaffMember],
    start: NaiveDate,
    today: NaiveDate,
) -> Result<()> {
    for (offset, description, rupees) in [
        (0, "Electricity bill", 8_400),
        (2, "Generator servicing", 3_200),
        (5, "Tea and snacks", 650),
    ] {
        let date = (start + Duration::days(offset)).min(today);
        db.expenses()
            .insert(&Expense {
                id: generate_id(),
                kind: ExpenseKind::Expense,
                description: description.to_string(),
                amount: Money::from_rupees(rupees),
                date,
                staff_id: None,
                created_by: "seed".to_string(),
                receipt_ref: None,
                created_at: Utc::now(),
            })
            .await?;
    }

    if let Some(member) = staff.first() {
        let amount = Money::from_rupees(2_000);
        let staff_ref = StaffRef {
            id: member.id.clone(),
            name: member.name.clone(),
        };
        let advance = Expense::salary_advance(
            generate_id(),
            &staff_ref,
            amount,
            today,
            "seed",
            Utc::now(),
        );

        let mut batch = db.begin_batch().await?;
        ExpenseRepository::insert_in(&mut batch, &advance).await?;
        StaffRepository::apply_advance_in(&mut batch, &member.id, amount).await?;
        batch.commit().await?;
    }
    Ok(())
}
