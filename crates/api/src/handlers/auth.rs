//! Handlers for the `/auth` resource (register, login, refresh, logout, profile).

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use studiora_core::error::CoreError;
use studiora_core::roles::registration_role;
use studiora_db::models::session::{NewSession, Session, SessionState};
use studiora_db::models::user::{CreateUser, RegisterUser, UpdateProfile, User, UserResponse};
use studiora_db::repositories::{SessionRepo, UserRepo};
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rate_limit::client_ip;
use crate::response::DataResponse;
use crate::state::AppState;

/// Consecutive failed logins before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i32 = 15;

/// Longest `User-Agent` kept on a session row.
const MAX_USER_AGENT_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by register, login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid email or password".into(),
    ))
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    input.validate()?;
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let role = registration_role(input.role.as_deref())?;

    if UserRepo::email_taken(&state.pool, &input.email).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "An account with this email already exists".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email.trim().to_string(),
            name: input.name.trim().to_string(),
            phone: input.phone,
            password_hash,
            role: role.to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role, "User registered");

    let response = issue_tokens(&state, user, &headers, None).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if user.is_locked(Utc::now()) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is temporarily locked. Try again later.".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        if let Some(until) = UserRepo::register_failed_login(
            &state.pool,
            user.id,
            MAX_FAILED_ATTEMPTS,
            LOCK_DURATION_MINS,
        )
        .await?
        {
            tracing::warn!(user_id = user.id, %until, "Account locked after repeated failed logins");
        }
        return Err(invalid_credentials());
    }

    UserRepo::record_login(&state.pool, user.id).await?;

    let response = issue_tokens(&state, user, &headers, None).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Exchanges the refresh token for a new pair. Each token works once:
/// presenting an already exchanged token revokes every token descended
/// from the same sign-in.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let expired = || {
        AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        ))
    };

    let session =
        SessionRepo::find_by_token_hash(&state.pool, &hash_refresh_token(&input.refresh_token))
            .await?
            .ok_or_else(expired)?;

    match session.state(Utc::now()) {
        SessionState::Active => {}
        SessionState::Expired | SessionState::Revoked => return Err(expired()),
        SessionState::Reused => {
            let revoked = SessionRepo::revoke_family(&state.pool, session.family_id).await?;
            tracing::warn!(
                user_id = session.user_id,
                family_id = session.family_id,
                revoked,
                "Refresh token reused, sign-in revoked"
            );
            return Err(expired());
        }
    }

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let response = issue_tokens(&state, user, &headers, Some(&session)).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/logout
///
/// Revokes every session of the caller. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_for_user(&state.pool, auth.user_id).await?;
    tracing::info!(user_id = auth.user_id, revoked, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;
    Ok(Json(DataResponse { data: user.into() }))
}

/// PUT /api/v1/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<UpdateProfile>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    input.validate()?;
    let user = UserRepo::update_profile(&state.pool, auth.user_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;
    Ok(Json(DataResponse { data: user.into() }))
}

/// Issue an access token and a refresh token.
///
/// With `rotating`, the refresh token succeeds that session in its family;
/// otherwise it starts a new family.
async fn issue_tokens(
    state: &AppState,
    user: User,
    headers: &HeaderMap,
    rotating: Option<&Session>,
) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    let next = NewSession {
        user_id: user.id,
        token_hash: refresh_hash,
        expires_at: Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect()),
        ip_address: Some(client_ip(headers, None)),
    };

    match rotating {
        Some(current) => {
            // A concurrent refresh with the same token got there first.
            SessionRepo::rotate(&state.pool, current, &next)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Unauthorized(
                        "Invalid or expired refresh token".into(),
                    ))
                })?;
        }
        None => {
            SessionRepo::start(&state.pool, &next).await?;
        }
    }

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: user.into(),
    })
}
