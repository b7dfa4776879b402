//! Handlers for client-owner messaging.
//!
//! A conversation is scoped to one studio and one client; the studio owner
//! is the other participant. Only participants may read or post.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use studiora_core::error::CoreError;
use studiora_core::types::DbId;
use studiora_db::models::conversation::{
    Conversation, ConversationSummary, Message, SendMessage, StartConversation,
};
use studiora_db::repositories::{ConversationRepo, MessageRepo, StudioRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::notify::message_event;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StartedConversation {
    pub conversation: Conversation,
    /// The opening message, when one was supplied.
    pub message: Option<Message>,
}

async fn load_participant_conversation(
    state: &AppState,
    conversation_id: DbId,
    user_id: DbId,
) -> AppResult<Conversation> {
    let conversation = ConversationRepo::find_by_id(&state.pool, conversation_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id: conversation_id,
        }))?;
    if !conversation.is_participant(user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You are not a participant of this conversation".into(),
        )));
    }
    Ok(conversation)
}

/// Store a message and notify the other participant.
async fn post_message(
    state: &AppState,
    conversation: &Conversation,
    sender_id: DbId,
    body: &str,
) -> AppResult<Message> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Message must not be empty".into(),
        )));
    }

    let message = MessageRepo::create(&state.pool, conversation.id, sender_id, body).await?;

    let studio_name = StudioRepo::find_by_id(&state.pool, conversation.studio_id)
        .await?
        .map(|s| s.name)
        .unwrap_or_default();
    state
        .event_bus
        .publish(message_event(conversation, &message, &studio_name));

    Ok(message)
}

/// GET /api/v1/conversations
pub async fn list_conversations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ConversationSummary>>>> {
    let (limit, offset) = params.clamped();
    let conversations =
        ConversationRepo::list_for_user(&state.pool, auth.user_id, limit, offset).await?;
    Ok(Json(DataResponse {
        data: conversations,
    }))
}

/// POST /api/v1/conversations
///
/// Opens (or reuses) the caller's thread with a studio, optionally posting a
/// first message.
pub async fn start_conversation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartConversation>,
) -> AppResult<(StatusCode, Json<DataResponse<StartedConversation>>)> {
    input.validate()?;

    let studio = StudioRepo::find_by_id(&state.pool, input.studio_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Studio",
            id: input.studio_id,
        }))?;
    if studio.owner_id == auth.user_id {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot start a conversation with your own studio".into(),
        )));
    }

    let conversation =
        ConversationRepo::find_or_create(&state.pool, studio.id, auth.user_id, studio.owner_id)
            .await?;

    let message = match input.message.as_deref() {
        Some(text) => Some(post_message(&state, &conversation, auth.user_id, text).await?),
        None => None,
    };

    tracing::debug!(conversation_id = conversation.id, studio_id = studio.id, "Conversation opened");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: StartedConversation {
                conversation,
                message,
            },
        }),
    ))
}

/// GET /api/v1/conversations/{id}/messages
///
/// Also marks the counterpart's messages on the returned page as read.
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Message>>>> {
    load_participant_conversation(&state, conversation_id, auth.user_id).await?;

    let (limit, offset) = params.clamped();
    let messages = MessageRepo::list(&state.pool, conversation_id, limit, offset).await?;
    let shown: Vec<DbId> = messages.iter().map(|m| m.id).collect();
    MessageRepo::mark_read(&state.pool, conversation_id, auth.user_id, &shown).await?;

    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/conversations/{id}/messages
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
    Json(input): Json<SendMessage>,
) -> AppResult<(StatusCode, Json<DataResponse<Message>>)> {
    input.validate()?;
    let conversation = load_participant_conversation(&state, conversation_id, auth.user_id).await?;

    let message = post_message(&state, &conversation, auth.user_id, &input.body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}
