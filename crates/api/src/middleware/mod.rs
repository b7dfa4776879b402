//! Request extractors and middleware.
//!
//! - [`auth::AuthUser`] -- the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireOwner`] -- requires the `owner` (or `admin`) role.
//! - [`rate_limit::enforce`] -- per-IP fixed-window limits on `/api/v1`.

pub mod auth;
pub mod rate_limit;
pub mod rbac;
