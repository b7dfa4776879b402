//! Conversation and message models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studiora_core::types::{DbId, Timestamp};
use validator::Validate;

/// A row from the `conversations` table: one thread per (studio, client).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conversation {
    pub id: DbId,
    pub studio_id: DbId,
    pub client_id: DbId,
    pub owner_id: DbId,
    pub last_message_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    pub fn is_participant(&self, user_id: DbId) -> bool {
        self.client_id == user_id || self.owner_id == user_id
    }

    /// The other side of the conversation.
    pub fn counterpart(&self, user_id: DbId) -> DbId {
        if self.client_id == user_id {
            self.owner_id
        } else {
            self.client_id
        }
    }
}

/// Conversation list entry for the inbox view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConversationSummary {
    pub id: DbId,
    pub studio_id: DbId,
    pub studio_name: String,
    pub client_id: DbId,
    pub owner_id: DbId,
    pub last_message: Option<String>,
    pub last_message_at: Option<Timestamp>,
    pub unread_count: i64,
}

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub sender_id: DbId,
    pub body: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Request body for starting a conversation with a studio.
#[derive(Debug, Deserialize, Validate)]
pub struct StartConversation {
    pub studio_id: DbId,
    #[validate(length(min = 1, max = 4000, message = "must be 1-4000 characters"))]
    pub message: Option<String>,
}

/// Request body for sending a message.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessage {
    #[validate(length(min = 1, max = 4000, message = "must be 1-4000 characters"))]
    pub body: String,
}
