//! Tanker deliveries and the tank stock derived from them.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use pumpdesk_core::ledger::{compute_tank_stats, TankStats};
use pumpdesk_core::validation::validate_intake_amount;
use pumpdesk_core::{FuelIntake, FuelType, Volume};
use pumpdesk_db::{generate_id, Collection};

use crate::error::ServiceResult;
use crate::identity::Caller;
use crate::services::with_snapshot_fallback;
use crate::state::AppState;

/// A delivery as entered on the intake form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewIntake {
    pub date: NaiveDate,
    pub fuel_type: FuelType,
    pub amount: Volume,
    #[serde(default)]
    pub invoice_ref: String,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn add_intake(
    state: &AppState,
    actor: &Caller,
    input: NewIntake,
) -> ServiceResult<FuelIntake> {
    actor.require_operator("record fuel intakes")?;
    validate_intake_amount(input.amount)?;

    let intake = FuelIntake {
        id: generate_id(),
        date: input.date,
        fuel_type: input.fuel_type,
        amount: input.amount,
        invoice_ref: input.invoice_ref.trim().to_string(),
        note: input
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        created_by: actor.display_name().to_string(),
        created_at: Utc::now(),
    };
    state.db().intakes().insert(&intake).await?;

    info!(id = %intake.id, fuel_type = %intake.fuel_type, amount = %intake.amount, "Fuel intake recorded");
    Ok(intake)
}

pub async fn list_intakes(state: &AppState, _actor: &Caller) -> ServiceResult<Vec<FuelIntake>> {
    let fetched = state.db().intakes().list().await;
    with_snapshot_fallback(state, Collection::FuelIntakes, fetched).await
}

pub async fn delete_intake(state: &AppState, actor: &Caller, id: &str) -> ServiceResult<()> {
    actor.require_admin("delete fuel intakes")?;
    state.db().intakes().delete(id).await?;
    info!(id = %id, by = %actor.display_name(), "Fuel intake deleted");
    Ok(())
}

/// Current stock per tank: everything delivered minus everything sold.
pub async fn tank_stats(state: &AppState, actor: &Caller) -> ServiceResult<TankStats> {
    let intakes = list_intakes(state, actor).await?;
    let fetched = state.db().readings().list().await;
    let readings = with_snapshot_fallback(state, Collection::Readings, fetched).await?;
    Ok(compute_tank_stats(&intakes, &readings, &state.capacities()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{actor, test_state};
    use pumpdesk_core::Role;

    fn delivery(fuel_type: FuelType, litres: i64) -> NewIntake {
        NewIntake {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            fuel_type,
            amount: Volume::from_litres(litres),
            invoice_ref: " INV-42 ".to_string(),
            note: Some("   ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_intake_raises_stock() {
        let (_dir, state) = test_state().await;
        let manager = actor(Role::Manager);

        let intake = add_intake(&state, &manager, delivery(FuelType::Diesel, 5_000))
            .await
            .unwrap();
        assert_eq!(intake.invoice_ref, "INV-42");
        assert_eq!(intake.note, None);

        let stats = tank_stats(&state, &manager).await.unwrap();
        assert_eq!(stats.diesel.current, Volume::from_litres(5_000));
        assert_eq!(stats.diesel.percentage, 25.0);
        assert_eq!(stats.petrol.current, Volume::zero());
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let (_dir, state) = test_state().await;

        let err = add_intake(&state, &actor(Role::Admin), delivery(FuelType::Petrol, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
