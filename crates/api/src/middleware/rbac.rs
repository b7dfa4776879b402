//! Role-based access control extractors.
//!
//! Ownership of a particular studio is checked in the handlers; these
//! extractors only gate on the caller's role.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use studiora_core::error::CoreError;
use studiora_core::roles::{ROLE_ADMIN, ROLE_OWNER};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `owner` or `admin` role. Rejects with 403 otherwise.
///
/// ```ignore
/// async fn create_studio(RequireOwner(user): RequireOwner) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireOwner(pub AuthUser);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_OWNER && user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Studio owner role required".into(),
            )));
        }
        Ok(RequireOwner(user))
    }
}
