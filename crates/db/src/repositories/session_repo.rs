//! Repository for the `user_sessions` table.
//!
//! Refresh tokens rotate: every exchange marks the presented row rotated
//! and inserts its successor in the same family. A rotated token that shows
//! up again is treated as stolen and its whole family is revoked.

use sqlx::PgPool;
use studiora_core::types::DbId;

use crate::models::session::{NewSession, Session};

const COLUMNS: &str = "id, user_id, family_id, token_hash, expires_at, rotated_at, revoked_at, \
                        user_agent, ip_address, created_at, updated_at";

pub struct SessionRepo;

impl SessionRepo {
    /// Issue the first token of a new family (login or registration).
    pub async fn start(pool: &PgPool, input: &NewSession) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, token_hash, expires_at, user_agent, ip_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .bind(&input.user_agent)
            .bind(&input.ip_address)
            .fetch_one(pool)
            .await
    }

    /// Look a token up in any state, so reuse of a rotated one is visible.
    pub async fn find_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE token_hash = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Exchange `current` for `next` within the same family.
    ///
    /// `None` when `current` was rotated or revoked in the meantime; two
    /// concurrent refreshes with one token never both succeed.
    pub async fn rotate(
        pool: &PgPool,
        current: &Session,
        next: &NewSession,
    ) -> Result<Option<Session>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE user_sessions SET rotated_at = NOW()
             WHERE id = $1 AND rotated_at IS NULL AND revoked_at IS NULL",
        )
        .bind(current.id)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO user_sessions
                (user_id, family_id, token_hash, expires_at, user_agent, ip_address)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(current.user_id)
            .bind(current.family_id)
            .bind(&next.token_hash)
            .bind(next.expires_at)
            .bind(&next.user_agent)
            .bind(&next.ip_address)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(session))
    }

    /// Revoke every live token of a family. Returns how many were revoked.
    pub async fn revoke_family(pool: &PgPool, family_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = NOW()
             WHERE family_id = $1 AND revoked_at IS NULL",
        )
        .bind(family_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn revoke_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = NOW()
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired tokens.
    ///
    /// Rotated and revoked rows are kept until they expire so that a replayed
    /// token is still recognised as reuse.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
