//! Well-known role name constants.
//!
//! These must match the `ck_users_role` CHECK constraint in the users migration.

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_OWNER: &str = "owner";
pub const ROLE_CLIENT: &str = "client";

/// Roles a user may pick for themselves at registration.
pub const SELF_ASSIGNABLE_ROLES: &[&str] = &[ROLE_CLIENT, ROLE_OWNER];

/// Resolve the role requested at registration, defaulting to `client`.
pub fn registration_role(requested: Option<&str>) -> Result<&'static str, CoreError> {
    match requested {
        None => Ok(ROLE_CLIENT),
        Some(role) => SELF_ASSIGNABLE_ROLES
            .iter()
            .copied()
            .find(|r| *r == role)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid role '{role}'. Must be one of: {}",
                    SELF_ASSIGNABLE_ROLES.join(", ")
                ))
            }),
    }
}
