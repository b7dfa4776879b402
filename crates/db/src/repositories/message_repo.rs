//! Repository for the `messages` table.

use sqlx::PgPool;
use studiora_core::types::DbId;

use crate::models::conversation::Message;

const COLUMNS: &str = "id, conversation_id, sender_id, body, is_read, read_at, created_at";

pub struct MessageRepo;

impl MessageRepo {
    /// Append a message and bump the conversation's `last_message_at`.
    pub async fn create(
        pool: &PgPool,
        conversation_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> Result<Message, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO messages (conversation_id, sender_id, body)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(sender_id)
            .bind(body)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(conversation_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Messages of a conversation, oldest first.
    pub async fn list(
        pool: &PgPool,
        conversation_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark the given messages as read by `reader_id`.
    ///
    /// Only messages of this conversation sent by the other party are
    /// touched. Returns the number of messages updated.
    pub async fn mark_read(
        pool: &PgPool,
        conversation_id: DbId,
        reader_id: DbId,
        message_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE, read_at = NOW()
             WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_read
               AND id = ANY($3)",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .bind(message_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
