//! # Local Identity Provider
//!
//! Email/password sign-in against the `users` collection, argon2 password
//! hashes, and JWT session tokens.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  authenticate(email, password)                                          │
//! │       │  argon2 verify against the stored hash                          │
//! │       ▼                                                                 │
//! │  profile role allowed? ──no──► sign-out, PermissionDenied               │
//! │       │ yes                                                             │
//! │       ▼                                                                 │
//! │  Session { token (JWT: sub = uid), actor }  ──► watch: Some(actor)      │
//! │                                                                         │
//! │  verify(token)  (every privileged call)                                 │
//! │       │  signature + expiry                                             │
//! │       ▼                                                                 │
//! │  reload profile by uid ──missing / role not allowed──► forced sign-out  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Actor with the STORED role (the token never carries one)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::ops::Deref;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use pumpdesk_core::{Actor, Role, UserProfile};
use pumpdesk_db::UserRepository;

use crate::config::BackofficeConfig;
use crate::error::{ServiceError, ServiceResult};

/// JWT claims. Identity only; the role is always reloaded from the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Subject (uid)
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// The caller of a service, as established by [`LocalIdentityProvider::verify`].
///
/// Services take a `Caller` rather than a bare [`Actor`]; outside this crate
/// the only way to get one is a verified session token. Derefs to the actor.
///
/// ```compile_fail
/// use backoffice::Caller;
/// use pumpdesk_core::{Actor, Role};
///
/// let forged = Caller::verified(Actor {
///     uid: "x".into(),
///     email: "x@station.in".into(),
///     name: "X".into(),
///     role: Role::Admin,
/// });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(Actor);

impl Caller {
    pub(crate) fn verified(actor: Actor) -> Self {
        Caller(actor)
    }

    pub fn actor(&self) -> &Actor {
        &self.0
    }
}

impl Deref for Caller {
    type Target = Actor;

    fn deref(&self) -> &Actor {
        &self.0
    }
}

/// A signed-in session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub actor: Actor,
    pub expires_at: DateTime<Utc>,
}

pub struct LocalIdentityProvider {
    users: UserRepository,
    secret: String,
    ttl_secs: i64,
    allowed_roles: Vec<Role>,
    current: watch::Sender<Option<Actor>>,
}

impl LocalIdentityProvider {
    pub fn new(users: UserRepository, config: &BackofficeConfig) -> Self {
        let (current, _) = watch::channel(None);
        LocalIdentityProvider {
            users,
            secret: config.jwt_secret.clone(),
            ttl_secs: config.session_ttl_secs,
            allowed_roles: config.allowed_session_roles.clone(),
            current,
        }
    }

    /// Signs in with email and password.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let profile = match self.users.find_by_email(email).await? {
            Some(profile) if verify_password(password, &profile.password_hash) => profile,
            _ => {
                warn!(email = %email, "Sign-in rejected");
                return Err(ServiceError::Unauthenticated);
            }
        };

        let actor = self.admit(&profile)?;
        let session = self.issue(&actor)?;

        info!(uid = %actor.uid, role = %actor.role, "Signed in");
        self.current.send_replace(Some(actor));
        Ok(session)
    }

    /// Resolves a session token to the caller, with the role read from the
    /// stored profile.
    ///
    /// A token whose profile has disappeared, or whose role is no longer
    /// allowed a session, signs the user out.
    pub async fn verify(&self, token: &str) -> ServiceResult<Caller> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            warn!(error = %e, "Session token rejected");
            ServiceError::Unauthenticated
        })?
        .claims;

        let Some(profile) = self.users.get_by_uid(&claims.sub).await? else {
            warn!(uid = %claims.sub, "Role profile missing, forcing sign-out");
            self.sign_out();
            return Err(ServiceError::Unauthenticated);
        };

        let actor = self.admit(&profile)?;
        self.current.send_if_modified(|current| {
            if current.as_ref() == Some(&actor) {
                false
            } else {
                *current = Some(actor.clone());
                true
            }
        });
        Ok(Caller::verified(actor))
    }

    /// The stored role profile for `uid`.
    pub async fn fetch_role_profile(&self, uid: &str) -> ServiceResult<Option<UserProfile>> {
        Ok(self.users.get_by_uid(uid).await?)
    }

    /// Current identity, then every change to it.
    pub fn on_identity_change(&self) -> watch::Receiver<Option<Actor>> {
        self.current.subscribe()
    }

    pub fn current(&self) -> Option<Actor> {
        self.current.borrow().clone()
    }

    pub fn sign_out(&self) {
        let previous = self.current.send_replace(None);
        if let Some(actor) = previous {
            info!(uid = %actor.uid, "Signed out");
        }
    }

    pub(crate) fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Turns a profile into an actor, or signs out if its role may not hold
    /// a session.
    fn admit(&self, profile: &UserProfile) -> ServiceResult<Actor> {
        if !self.allowed_roles.contains(&profile.role) {
            warn!(uid = %profile.uid, role = %profile.role, "Role not allowed a session, forcing sign-out");
            self.sign_out();
            return Err(ServiceError::PermissionDenied {
                action: "hold a session".to_string(),
                role: profile.role.to_string(),
            });
        }

        Ok(Actor {
            uid: profile.uid.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            role: profile.role,
        })
    }

    fn issue(&self, actor: &Actor) -> ServiceResult<Session> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_secs);

        let claims = Claims {
            sub: actor.uid.clone(),
            email: actor.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("Failed to sign session token: {}", e)))?;

        Ok(Session {
            token,
            actor: actor.clone(),
            expires_at,
        })
    }
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
