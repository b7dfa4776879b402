//! Refresh-token sessions.

use sqlx::FromRow;
use studiora_core::types::{DbId, Timestamp};

/// One issued refresh token. Only its SHA-256 digest is stored.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    /// Shared by every token descended from the same sign-in.
    pub family_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    /// Set when the token was exchanged for its successor.
    pub rotated_at: Option<Timestamp>,
    /// Set on logout or when the family was revoked.
    pub revoked_at: Option<Timestamp>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// What presenting a token means for its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
    Revoked,
    /// Already exchanged once. Presenting it again means the token leaked.
    Reused,
}

impl Session {
    pub fn state(&self, now: Timestamp) -> SessionState {
        if self.revoked_at.is_some() {
            SessionState::Revoked
        } else if self.rotated_at.is_some() {
            SessionState::Reused
        } else if self.expires_at <= now {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }
}

/// A refresh token about to be issued.
#[derive(Debug)]
pub struct NewSession {
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
