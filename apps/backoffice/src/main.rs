//! # Pumpdesk
//!
//! Opens the station store, makes sure an admin exists, prints today's
//! overview and exits.
//!
//! ## Environment
//! Store and session settings: see [`backoffice::BackofficeConfig::from_env`].
//! `PUMPDESK_ADMIN_EMAIL` / `PUMPDESK_ADMIN_PASSWORD` create the first admin
//! of an empty store.

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use backoffice::{bootstrap_admin, init_tracing, local_today, AppState, BackofficeConfig, LiveDashboard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting Pumpdesk back office...");

    let config = BackofficeConfig::from_env().context("Invalid configuration")?;
    info!(db = ?config.db_path, "Configuration loaded");

    let state = AppState::init(config)
        .await
        .context("Failed to open the station store")?;

    if let (Ok(email), Ok(password)) = (
        std::env::var("PUMPDESK_ADMIN_EMAIL"),
        std::env::var("PUMPDESK_ADMIN_PASSWORD"),
    ) {
        match bootstrap_admin(&state, &email, &password, "Owner").await {
            Ok(Some(profile)) => info!(uid = %profile.uid, "First admin created"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not create the first admin"),
        }
    }

    let today = local_today();
    let mut dashboard = LiveDashboard::open(&state, today);
    let mut view = dashboard.subscribe();

    let ready = tokio::time::timeout(Duration::from_secs(10), view.wait_for(|v| v.is_some())).await;
    let overview = match ready {
        Ok(Ok(current)) => current.clone(),
        _ => None,
    };

    match overview {
        Some(overview) => {
            let metrics = &overview.metrics;
            info!(
                date = %overview.date,
                usage = %metrics.today_usage,
                revenue = %metrics.today_revenue,
                dues = %metrics.total_dues,
                expenses = %metrics.monthly_expenses,
                petrol_pct = metrics.tank.petrol.percentage,
                diesel_pct = metrics.tank.diesel.percentage,
                present = overview.attendance.present,
                staff = overview.attendance.total,
                "Today's overview"
            );
        }
        None => warn!("Overview not available"),
    }

    dashboard.close().await;
    state.dispose().await;
    Ok(())
}
