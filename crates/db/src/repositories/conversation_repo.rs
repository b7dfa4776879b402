//! Repository for the `conversations` table.

use sqlx::PgPool;
use studiora_core::types::DbId;

use crate::models::conversation::{Conversation, ConversationSummary};

const COLUMNS: &str = "id, studio_id, client_id, owner_id, last_message_at, created_at, updated_at";

pub struct ConversationRepo;

impl ConversationRepo {
    /// Return the thread between `client_id` and the studio, creating it on
    /// first contact.
    pub async fn find_or_create(
        pool: &PgPool,
        studio_id: DbId,
        client_id: DbId,
        owner_id: DbId,
    ) -> Result<Conversation, sqlx::Error> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let query = format!(
            "INSERT INTO conversations (studio_id, client_id, owner_id)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_conversations_studio_client
             DO UPDATE SET studio_id = EXCLUDED.studio_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(studio_id)
            .bind(client_id)
            .bind(owner_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM conversations WHERE id = $1");
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Inbox of a user: every conversation they take part in, most recently
    /// active first, with the last message and the unread count for them.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationSummary>, sqlx::Error> {
        sqlx::query_as::<_, ConversationSummary>(
            "SELECT c.id, c.studio_id, s.name AS studio_name, c.client_id, c.owner_id,
                    lm.body AS last_message, c.last_message_at,
                    (SELECT COUNT(*) FROM messages m
                     WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND NOT m.is_read
                    ) AS unread_count
             FROM conversations c
             JOIN studios s ON s.id = c.studio_id
             LEFT JOIN LATERAL (
                SELECT body FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
             ) lm ON TRUE
             WHERE c.client_id = $1 OR c.owner_id = $1
             ORDER BY c.last_message_at DESC NULLS LAST, c.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
