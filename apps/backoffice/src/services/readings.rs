//! # Reading Services
//!
//! The reading-entry workflow: load the form for a date, save it (replacing
//! any reading already stored for that date), look readings up.

use chrono::{NaiveDate, Utc};
use tracing::info;

use pumpdesk_core::ledger::build_reading;
use pumpdesk_core::validation::{validate_non_negative, validate_pump_entries};
use pumpdesk_core::{FuelPrices, PumpEntry, Reading, ReadingDraft, Volume};
use pumpdesk_db::{generate_id, Collection};

use crate::error::ServiceResult;
use crate::identity::Caller;
use crate::services::with_snapshot_fallback;
use crate::state::{local_today, AppState};

/// The entry form for `date`: the stored reading's values when one exists,
/// otherwise zeroed entries for every pump.
pub async fn draft_for_date(
    state: &AppState,
    actor: &Caller,
    date: NaiveDate,
) -> ServiceResult<ReadingDraft> {
    actor.require_operator("enter readings")?;

    let draft = match state.db().readings().find_by_date(date).await? {
        Some(reading) => ReadingDraft {
            date,
            prices: reading.prices(),
            entries: reading
                .pumps
                .iter()
                .map(|line| PumpEntry {
                    pump_id: line.pump_id,
                    opening: line.opening,
                    closing: line.closing,
                    image_ref: line.image_ref.clone(),
                })
                .collect(),
        },
        None => ReadingDraft {
            date,
            prices: FuelPrices::default(),
            entries: state
                .pumps()
                .iter()
                .map(|pump| PumpEntry::new(pump.id, Volume::zero(), Volume::zero()))
                .collect(),
        },
    };
    Ok(draft)
}

/// Validates and stores the reading for `draft.date`.
///
/// Saving a date that already has a reading replaces it; there is never a
/// second reading for the same date.
pub async fn save_reading(
    state: &AppState,
    actor: &Caller,
    draft: ReadingDraft,
) -> ServiceResult<Reading> {
    actor.require_operator("save readings")?;
    validate_pump_entries(&draft.entries)?;
    validate_non_negative("petrol_price", draft.prices.petrol.paise())?;
    validate_non_negative("diesel_price", draft.prices.diesel.paise())?;

    let now = Utc::now();
    let reading = build_reading(generate_id(), &draft, state.pumps(), now, now);
    let stored = state.db().readings().upsert(&reading).await?;

    info!(
        id = %stored.id,
        date = %stored.date,
        usage = %stored.total_usage,
        revenue = %stored.total_revenue,
        by = %actor.display_name(),
        "Reading saved"
    );
    Ok(stored)
}

/// All readings, newest date first.
pub async fn list_readings(state: &AppState, _actor: &Caller) -> ServiceResult<Vec<Reading>> {
    let fetched = state.db().readings().list().await;
    with_snapshot_fallback(state, Collection::Readings, fetched).await
}

pub async fn reading_for_date(
    state: &AppState,
    _actor: &Caller,
    date: NaiveDate,
) -> ServiceResult<Option<Reading>> {
    Ok(state.db().readings().find_by_date(date).await?)
}

/// The reading for the station's local date.
pub async fn todays_reading(state: &AppState, actor: &Caller) -> ServiceResult<Option<Reading>> {
    reading_for_date(state, actor, local_today()).await
}

pub async fn delete_reading(state: &AppState, actor: &Caller, id: &str) -> ServiceResult<()> {
    actor.require_admin("delete readings")?;
    state.db().readings().delete(id).await?;
    info!(id = %id, by = %actor.display_name(), "Reading deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{actor, file_state, test_state};
    use pumpdesk_core::{Money, Role};
    use std::sync::Arc;
    use tokio::task::JoinSet;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_draft_has_every_pump() {
        let (_dir, state) = test_state().await;

        let draft = draft_for_date(&state, &actor(Role::Manager), day()).await.unwrap();
        assert_eq!(draft.entries.len(), 6);
        assert!(draft.entries.iter().all(|e| e.closing == Volume::zero()));
    }

    #[tokio::test]
    async fn test_save_then_edit_same_date() {
        let (_dir, state) = test_state().await;
        let manager = actor(Role::Manager);

        let mut draft = draft_for_date(&state, &manager, day()).await.unwrap();
        draft.prices = FuelPrices::new(Money::from_rupees(100), Money::from_rupees(90));
        draft.entries[0].opening = Volume::from_litres(100);
        draft.entries[0].closing = Volume::from_litres(150);
        let first = save_reading(&state, &manager, draft).await.unwrap();
        assert_eq!(first.total_revenue, Money::from_rupees(5_000));

        let mut edit = draft_for_date(&state, &manager, day()).await.unwrap();
        assert_eq!(edit.entries[0].closing, Volume::from_litres(150));
        edit.entries[0].closing = Volume::from_litres(160);
        let second = save_reading(&state, &manager, edit).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.total_usage, Volume::from_litres(60));
        assert_eq!(list_readings(&state, &manager).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_entries_and_roles() {
        let (_dir, state) = test_state().await;

        let mut draft = draft_for_date(&state, &actor(Role::Admin), day()).await.unwrap();
        draft.entries[0].opening = Volume::from_litres(200);
        draft.entries[0].closing = Volume::from_litres(150);
        assert!(matches!(
            save_reading(&state, &actor(Role::Admin), draft.clone()).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            save_reading(&state, &actor(Role::Employee), draft).await,
            Err(ServiceError::PermissionDenied { .. })
        ));
        assert!(list_readings(&state, &actor(Role::Admin)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_admin_deletes() {
        let (_dir, state) = test_state().await;
        let draft = draft_for_date(&state, &actor(Role::Admin), day()).await.unwrap();
        let reading = save_reading(&state, &actor(Role::Admin), draft).await.unwrap();

        assert!(matches!(
            delete_reading(&state, &actor(Role::Manager), &reading.id).await,
            Err(ServiceError::PermissionDenied { .. })
        ));
        delete_reading(&state, &actor(Role::Admin), &reading.id).await.unwrap();
        assert!(reading_for_date(&state, &actor(Role::Admin), day()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_of_one_date_all_succeed() {
        let (_dir, state) = file_state().await;
        let state = Arc::new(state);

        let mut saves = JoinSet::new();
        for extra in 0..8 {
            let state = Arc::clone(&state);
            saves.spawn(async move {
                let manager = actor(Role::Manager);
                let mut draft = draft_for_date(&state, &manager, day()).await?;
                draft.prices = FuelPrices::new(Money::from_rupees(100), Money::zero());
                draft.entries[0].opening = Volume::from_litres(100);
                draft.entries[0].closing = Volume::from_litres(110 + extra);
                save_reading(&state, &manager, draft).await
            });
        }

        let mut saved = Vec::new();
        while let Some(joined) = saves.join_next().await {
            saved.push(joined.unwrap().unwrap());
        }
        assert_eq!(saved.len(), 8);

        let stored = state.db().readings().list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(saved.iter().all(|r| r.id == stored[0].id));
        assert!(saved.iter().any(|r| r.total_petrol == stored[0].total_petrol));
    }
}
