//! Repository for the `users` table.
//!
//! Emails are stored lower-cased; every lookup lower-cases its argument, so
//! `Anna@Example.com` and `anna@example.com` are one account.

use sqlx::PgPool;
use studiora_core::types::{DbId, Timestamp};

use crate::models::user::{CreateUser, UpdateProfile, User};

const COLUMNS: &str = "id, email, name, phone, password_hash, role, is_active, \
                        last_login_at, failed_login_count, locked_until, created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, name, phone, password_hash, role)
             VALUES (lower($1), $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.email.trim())
            .bind(&input.name)
            .bind(&input.phone)
            .bind(&input.password_hash)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = lower($1))")
            .bind(email.trim())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = lower($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Apply the non-`None` fields of a profile edit.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProfile,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.phone)
            .fetch_optional(pool)
            .await
    }

    /// Count a wrong password.
    ///
    /// The `max_attempts`-th consecutive failure locks the account for
    /// `lock_mins` minutes and restarts the count. Returns the lock expiry
    /// when this attempt caused the lock. Done in one statement so parallel
    /// guesses cannot slip past the threshold.
    pub async fn register_failed_login(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
        lock_mins: i32,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let locked: Option<Option<Timestamp>> = sqlx::query_scalar(
            "UPDATE users SET
                failed_login_count = CASE
                    WHEN failed_login_count + 1 >= $2 THEN 0
                    ELSE failed_login_count + 1
                END,
                locked_until = CASE
                    WHEN failed_login_count + 1 >= $2 THEN NOW() + make_interval(mins => $3)
                    ELSE locked_until
                END
             WHERE id = $1
             RETURNING CASE WHEN failed_login_count = 0 THEN locked_until END",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_mins)
        .fetch_optional(pool)
        .await?;
        Ok(locked.flatten())
    }

    /// Clear the failure count and lock, and stamp `last_login_at`.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET failed_login_count = 0, locked_until = NULL, last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
