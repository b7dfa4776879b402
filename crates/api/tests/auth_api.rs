//! HTTP-level integration tests for registration, login, token refresh,
//! logout and the profile endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, get, get_auth, post_json, post_json_auth, put_json_auth, register, TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;

async fn login(app: axum::Router, email: &str, password: &str) -> axum::response::Response {
    post_json(
        app,
        "/api/v1/auth/login",
        json!({ "email": email, "password": password }),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_returns_tokens_and_profile(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/register",
        json!({
            "email": "Anna@Example.com",
            "name": "Anna",
            "password": TEST_PASSWORD,
            "role": "owner",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["expires_in"], 15 * 60);
    assert_eq!(json["user"]["email"], "anna@example.com");
    assert_eq!(json["user"]["role"], "owner");
    assert!(json["user"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_defaults_to_client_role(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/register",
        json!({ "email": "c@example.com", "name": "C", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["user"]["role"], "client");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_admin_role(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/register",
        json!({ "email": "x@example.com", "name": "X", "password": TEST_PASSWORD, "role": "admin" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_weak_password_and_bad_email(pool: PgPool) {
    let app = common::build_test_app(pool);

    let weak = post_json(
        app.clone(),
        "/api/v1/auth/register",
        json!({ "email": "w@example.com", "name": "W", "password": "short" }),
    )
    .await;
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

    let bad_email = post_json(
        app,
        "/api/v1/auth/register",
        json!({ "email": "not-an-email", "name": "W", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_email).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_is_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "dup@example.com", "client").await;

    let response = post_json(
        app,
        "/api/v1/auth/register",
        json!({ "email": "DUP@example.com", "name": "Again", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_with_valid_and_invalid_credentials(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = register(app.clone(), "login@example.com", "client").await;

    let ok = login(app.clone(), "login@example.com", TEST_PASSWORD).await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(body_json(ok).await["user"]["id"], user.id);

    let wrong = login(app.clone(), "login@example.com", "wrong password 1").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let unknown = login(app, "ghost@example.com", TEST_PASSWORD).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn account_locks_after_repeated_failures(pool: PgPool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "lock@example.com", "client").await;

    for _ in 0..5 {
        let response = login(app.clone(), "lock@example.com", "wrong password 1").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused while locked.
    let response = login(app, "lock@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_account_cannot_log_in(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let user = register(app.clone(), "gone@example.com", "client").await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let response = login(app, "gone@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_the_token(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = register(app.clone(), "rot@example.com", "client").await;

    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": user.refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_ne!(json["refresh_token"], user.refresh_token.as_str());

    // The old token was revoked by the rotation.
    let reuse = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": user.refresh_token }),
    )
    .await;
    assert_eq!(reuse.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reused_refresh_token_revokes_the_sign_in(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = register(app.clone(), "leak@example.com", "client").await;
    let other_device = body_json(login(app.clone(), "leak@example.com", TEST_PASSWORD).await).await;

    let rotated = body_json(
        post_json(
            app.clone(),
            "/api/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
        )
        .await,
    )
    .await;
    let current = rotated["refresh_token"].as_str().unwrap().to_string();

    // Someone replays the exchanged token.
    let replay = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": user.refresh_token }),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    // The legitimate successor is revoked with it.
    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": current }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A separate sign-in is unaffected.
    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": other_device["refresh_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = register(app.clone(), "out@example.com", "client").await;

    let response = post_json_auth(app.clone(), "/api/v1/auth/logout", json!({}), &user.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": user.refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_requires_a_valid_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let anonymous = get(app.clone(), "/api/v1/auth/me").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let garbage = get_auth(app, "/api/v1/auth/me", "not.a.jwt").await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn profile_can_be_read_and_updated(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = register(app.clone(), "me@example.com", "client").await;

    let response = put_json_auth(
        app.clone(),
        "/api/v1/auth/me",
        json!({ "name": "Renamed" }),
        &user.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get_auth(app, "/api/v1/auth/me", &user.token).await).await;
    assert_eq!(json["data"]["name"], "Renamed");
    assert_eq!(json["data"]["email"], "me@example.com");
}
