//! # Staff Provisioning
//!
//! The one privileged boundary: creating sign-in credentials for someone
//! else. Runs with the caller's identity re-checked against the stored
//! role profile, never the role a client claims.
//!
//! ## Outcomes
//! | Situation                               | Error             |
//! |-----------------------------------------|-------------------|
//! | no caller                               | UNAUTHENTICATED   |
//! | caller profile missing or not admin     | PERMISSION_DENIED |
//! | email, password or name missing         | INVALID_ARGUMENT  |
//! | anything else (duplicate email, store)  | INTERNAL, generic |

use chrono::Utc;
use tracing::{error, info, warn};

use pumpdesk_core::access::authenticated;
use pumpdesk_core::validation::validate_email;
use pumpdesk_core::{Role, UserProfile};
use pumpdesk_db::generate_id;

use crate::error::{ServiceError, ServiceResult};
use crate::identity::{hash_password, Caller};
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Creates a staff login. The new profile gets the employee role and
/// `created_by` = the caller's uid.
pub async fn create_staff_login(
    state: &AppState,
    caller: Option<&Caller>,
    email: &str,
    password: &str,
    name: &str,
) -> ServiceResult<UserProfile> {
    let caller = authenticated(caller.map(Caller::actor))?;

    let stored = state
        .identity()
        .fetch_role_profile(&caller.uid)
        .await
        .map_err(generic_failure)?;
    match stored {
        Some(profile) if profile.role == Role::Admin => {}
        Some(profile) => {
            warn!(uid = %caller.uid, role = %profile.role, "Provisioning refused");
            return Err(ServiceError::PermissionDenied {
                action: "create staff logins".to_string(),
                role: profile.role.to_string(),
            });
        }
        None => {
            warn!(uid = %caller.uid, "Provisioning refused, caller has no profile");
            return Err(ServiceError::PermissionDenied {
                action: "create staff logins".to_string(),
                role: "unknown".to_string(),
            });
        }
    }

    let email = email.trim();
    let name = name.trim();
    if email.is_empty() || password.is_empty() || name.is_empty() {
        return Err(ServiceError::InvalidArgument(
            "email, password and name are required".to_string(),
        ));
    }
    if validate_email(email).is_err() {
        return Err(ServiceError::InvalidArgument("email is malformed".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::InvalidArgument(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let profile = UserProfile {
        uid: generate_id(),
        email: email.to_string(),
        name: name.to_string(),
        role: Role::Employee,
        password_hash: hash_password(password).map_err(generic_failure)?,
        created_by: Some(caller.uid.clone()),
        created_at: Utc::now(),
    };
    state
        .identity()
        .users()
        .insert(&profile)
        .await
        .map_err(|e| generic_failure(e.into()))?;

    info!(uid = %profile.uid, by = %caller.uid, "Staff login created");
    Ok(profile)
}

/// Creates the first admin of an empty store. Returns `None` once any
/// profile exists.
pub async fn bootstrap_admin(
    state: &AppState,
    email: &str,
    password: &str,
    name: &str,
) -> ServiceResult<Option<UserProfile>> {
    let users = state.identity().users();
    if users.count().await? > 0 {
        return Ok(None);
    }

    validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::InvalidArgument(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let profile = UserProfile {
        uid: generate_id(),
        email: email.trim().to_string(),
        name: name.trim().to_string(),
        role: Role::Admin,
        password_hash: hash_password(password)?,
        created_by: None,
        created_at: Utc::now(),
    };
    users.insert(&profile).await?;

    info!(uid = %profile.uid, "Bootstrap admin created");
    Ok(Some(profile))
}

fn generic_failure(err: ServiceError) -> ServiceError {
    error!(error = %err, "Staff provisioning failed");
    ServiceError::Internal("Could not create the staff login".to_string())
}
