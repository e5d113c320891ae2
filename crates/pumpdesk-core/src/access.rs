//! # Roles and Callers
//!
//! Every attributed or privileged field in the system is stamped from an
//! [`Actor`], the verified caller identity. Request payloads never carry a
//! uid, a name or a role of their own.
//!
//! ## Who May Do What
//! ```text
//! ┌──────────────────────────────┬────────┬─────────┬──────────┐
//! │ Operation                    │ admin  │ manager │ employee │
//! ├──────────────────────────────┼────────┼─────────┼──────────┤
//! │ Record readings / intakes    │   ✓    │    ✓    │          │
//! │ Khata, expenses, attendance  │   ✓    │    ✓    │          │
//! │ Raise ticket / leave request │        │    ✓    │    ✓     │
//! │ Approve / reject             │   ✓    │         │          │
//! │ Direct salary advance        │   ✓    │         │          │
//! │ Delete records, add staff    │   ✓    │         │          │
//! └──────────────────────────────┴────────┴─────────┴──────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Role
// =============================================================================

/// Role claim attached to a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    /// Pump attendants and other floor staff. Profiles provisioned by an
    /// admin carry this role; older records call it "staff".
    #[serde(alias = "staff")]
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "employee" | "staff" => Ok(Role::Employee),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// A caller identity: who is acting and in which role.
///
/// The back office only accepts it wrapped in a `Caller`, which is built
/// from a verified token and a fresh role-profile lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Display name used for `created_by` / `action_by` stamps.
    ///
    /// Falls back to the email when the profile has no name.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    /// Fails with `PermissionDenied` unless the actor holds one of `allowed`.
    pub fn require(&self, allowed: &[Role], action: &str) -> CoreResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(CoreError::permission_denied(action, self.role))
        }
    }

    /// Shorthand for `require(&[Role::Admin], action)`.
    pub fn require_admin(&self, action: &str) -> CoreResult<()> {
        self.require(&[Role::Admin], action)
    }

    /// Roles that keep the station's books (readings, khata, expenses...).
    pub fn require_operator(&self, action: &str) -> CoreResult<()> {
        self.require(&[Role::Admin, Role::Manager], action)
    }
}

/// Turns an optional session into a caller or `Unauthenticated`.
pub fn authenticated(actor: Option<&Actor>) -> CoreResult<&Actor> {
    actor.ok_or(CoreError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            uid: "u1".to_string(),
            email: "u1@station.test".to_string(),
            name: String::new(),
            role,
        }
    }

    #[test]
    fn test_role_parse_accepts_staff_alias() {
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Employee);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_alias() {
        let role: Role = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(role, Role::Employee);
        assert_eq!(serde_json::to_string(&Role::Employee).unwrap(), "\"employee\"");
    }

    #[test]
    fn test_require_is_explicit() {
        assert!(actor(Role::Admin).require_admin("delete readings").is_ok());
        let err = actor(Role::Manager)
            .require_admin("delete readings")
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { role: Role::Manager, .. }));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(actor(Role::Manager).display_name(), "u1@station.test");
    }

    #[test]
    fn test_authenticated() {
        assert!(matches!(authenticated(None), Err(CoreError::Unauthenticated)));
        let a = actor(Role::Employee);
        assert_eq!(authenticated(Some(&a)).unwrap().uid, "u1");
    }
}
