//! Backoffice configuration.
//!
//! Loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use directories::ProjectDirs;
use pumpdesk_core::ledger::TankCapacities;
use pumpdesk_core::{Role, Volume};

/// Backoffice configuration.
#[derive(Debug, Clone)]
pub struct BackofficeConfig {
    /// SQLite file. `None` means an in-memory store (tests).
    pub db_path: Option<PathBuf>,

    /// Directory for offline snapshot files.
    pub snapshot_dir: PathBuf,

    /// Secret for signing session tokens
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    pub session_ttl_secs: i64,

    /// Tank capacities used by the stock view
    pub capacities: TankCapacities,

    /// Roles allowed to hold a session. A verified profile with any other
    /// role is signed out.
    pub allowed_session_roles: Vec<Role>,
}

impl Default for BackofficeConfig {
    fn default() -> Self {
        BackofficeConfig {
            db_path: None,
            snapshot_dir: env::temp_dir().join("pumpdesk-snapshots"),
            jwt_secret: "pumpdesk-dev-secret-change-in-production".to_string(),
            session_ttl_secs: 12 * 3600,
            capacities: TankCapacities::default(),
            allowed_session_roles: Role::ALL.to_vec(),
        }
    }
}

impl BackofficeConfig {
    /// In-memory store and a caller-chosen snapshot directory.
    pub fn for_tests(snapshot_dir: impl Into<PathBuf>) -> Self {
        BackofficeConfig {
            snapshot_dir: snapshot_dir.into(),
            ..BackofficeConfig::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// ## Variables
    /// - `PUMPDESK_DB_PATH` - database file (default: platform data dir)
    /// - `PUMPDESK_SNAPSHOT_DIR` - snapshot directory (default: next to the database)
    /// - `PUMPDESK_JWT_SECRET` - session signing secret
    /// - `PUMPDESK_SESSION_TTL_SECS` - session lifetime (default: 43200)
    /// - `PUMPDESK_PETROL_CAPACITY_L` / `PUMPDESK_DIESEL_CAPACITY_L` - tank sizes in litres
    /// - `PUMPDESK_SESSION_ROLES` - comma list, e.g. `admin,manager`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = TankCapacities::default();

        let db_path = match env::var("PUMPDESK_DB_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_data_dir()?.join("pumpdesk.db"),
        };

        let snapshot_dir = match env::var("PUMPDESK_SNAPSHOT_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => db_path
                .parent()
                .map(|p| p.join("snapshots"))
                .unwrap_or_else(|| PathBuf::from("snapshots")),
        };

        let jwt_secret = env::var("PUMPDESK_JWT_SECRET").unwrap_or_else(|_| {
            // Must be set in production
            "pumpdesk-dev-secret-change-in-production".to_string()
        });

        let session_ttl_secs: i64 = parse_var("PUMPDESK_SESSION_TTL_SECS", 12 * 3600)?;
        if session_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "PUMPDESK_SESSION_TTL_SECS".to_string(),
            ));
        }

        let petrol_l: i64 = parse_var(
            "PUMPDESK_PETROL_CAPACITY_L",
            defaults.petrol.millilitres() / 1000,
        )?;
        let diesel_l: i64 = parse_var(
            "PUMPDESK_DIESEL_CAPACITY_L",
            defaults.diesel.millilitres() / 1000,
        )?;
        if petrol_l <= 0 {
            return Err(ConfigError::InvalidValue(
                "PUMPDESK_PETROL_CAPACITY_L".to_string(),
            ));
        }
        if diesel_l <= 0 {
            return Err(ConfigError::InvalidValue(
                "PUMPDESK_DIESEL_CAPACITY_L".to_string(),
            ));
        }

        let allowed_session_roles = match env::var("PUMPDESK_SESSION_ROLES") {
            Ok(raw) => parse_roles(&raw)?,
            Err(_) => Role::ALL.to_vec(),
        };

        Ok(BackofficeConfig {
            db_path: Some(db_path),
            snapshot_dir,
            jwt_secret,
            session_ttl_secs,
            capacities: TankCapacities {
                petrol: Volume::from_litres(petrol_l),
                diesel: Volume::from_litres(diesel_l),
            },
            allowed_session_roles,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_roles(raw: &str) -> Result<Vec<Role>, ConfigError> {
    let mut roles = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let role: Role = part
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PUMPDESK_SESSION_ROLES".to_string()))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    if roles.is_empty() {
        return Err(ConfigError::InvalidValue(
            "PUMPDESK_SESSION_ROLES".to_string(),
        ));
    }
    Ok(roles)
}

/// Platform data directory.
///
/// - **macOS**: `~/Library/Application Support/in.pumpdesk.backoffice`
/// - **Windows**: `%APPDATA%\pumpdesk\backoffice`
/// - **Linux**: `~/.local/share/backoffice`
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("in", "pumpdesk", "backoffice")
        .ok_or_else(|| ConfigError::MissingRequired("PUMPDESK_DB_PATH".to_string()))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
