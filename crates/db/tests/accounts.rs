//! Integration tests for login lockout and refresh-token rotation.

mod common;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use studiora_db::models::session::{NewSession, SessionState};
use studiora_db::repositories::{SessionRepo, UserRepo};

fn token(user_id: i64, hash: &str) -> NewSession {
    NewSession {
        user_id,
        token_hash: hash.to_string(),
        expires_at: Utc::now() + Duration::days(30),
        user_agent: Some("tests".to_string()),
        ip_address: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn emails_are_case_insensitive(pool: PgPool) {
    common::user(&pool, "Anna@Example.com", "client").await;

    assert!(UserRepo::email_taken(&pool, "anna@example.COM").await.unwrap());
    let found = UserRepo::find_by_email(&pool, " ANNA@example.com ")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.email, "anna@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn third_failure_locks_and_restarts_the_count(pool: PgPool) {
    let user = common::user(&pool, "lock@example.com", "client").await;

    for _ in 0..2 {
        let locked = UserRepo::register_failed_login(&pool, user.id, 3, 15).await.unwrap();
        assert!(locked.is_none());
    }
    let locked = UserRepo::register_failed_login(&pool, user.id, 3, 15).await.unwrap();
    assert!(locked.is_some_and(|until| until > Utc::now() + Duration::minutes(14)));

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(user.is_locked(Utc::now()));
    assert_eq!(user.failed_login_count, 0);

    UserRepo::record_login(&pool, user.id).await.unwrap();
    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(!user.is_locked(Utc::now()));
    assert!(user.last_login_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rotation_keeps_the_family_and_works_once(pool: PgPool) {
    let user = common::user(&pool, "rot@example.com", "client").await;
    let first = SessionRepo::start(&pool, &token(user.id, "h1")).await.unwrap();

    let second = SessionRepo::rotate(&pool, &first, &token(user.id, "h2"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.family_id, first.family_id);

    // The same token cannot be exchanged twice.
    assert!(SessionRepo::rotate(&pool, &first, &token(user.id, "h3"))
        .await
        .unwrap()
        .is_none());

    let replayed = SessionRepo::find_by_token_hash(&pool, "h1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replayed.state(Utc::now()), SessionState::Reused);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn revoking_a_family_spares_other_sign_ins(pool: PgPool) {
    let user = common::user(&pool, "fam@example.com", "client").await;
    let laptop = SessionRepo::start(&pool, &token(user.id, "laptop")).await.unwrap();
    let phone = SessionRepo::start(&pool, &token(user.id, "phone")).await.unwrap();
    assert_ne!(laptop.family_id, phone.family_id);

    SessionRepo::rotate(&pool, &laptop, &token(user.id, "laptop-2"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        SessionRepo::revoke_family(&pool, laptop.family_id).await.unwrap(),
        2
    );

    let phone = SessionRepo::find_by_token_hash(&pool, "phone")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phone.state(Utc::now()), SessionState::Active);
    assert_eq!(SessionRepo::revoke_for_user(&pool, user.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn purge_drops_only_expired_tokens(pool: PgPool) {
    let user = common::user(&pool, "old@example.com", "client").await;
    let mut stale = token(user.id, "stale");
    stale.expires_at = Utc::now() - Duration::minutes(1);
    SessionRepo::start(&pool, &stale).await.unwrap();
    let live = SessionRepo::start(&pool, &token(user.id, "live")).await.unwrap();
    SessionRepo::revoke_family(&pool, live.family_id).await.unwrap();

    assert_eq!(SessionRepo::purge_expired(&pool).await.unwrap(), 1);
    assert!(SessionRepo::find_by_token_hash(&pool, "live")
        .await
        .unwrap()
        .is_some());
}
