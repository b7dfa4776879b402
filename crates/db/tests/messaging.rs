//! Integration tests for conversations, messages and notifications.

mod common;

use sqlx::PgPool;
use studiora_db::models::notification::CreateNotification;
use studiora_db::repositories::{ConversationRepo, MessageRepo, NotificationRepo};

#[sqlx::test(migrations = "../../db/migrations")]
async fn one_conversation_per_client_and_studio(pool: PgPool) {
    let owner = common::user(&pool, "owner@example.com", "owner").await;
    let client = common::user(&pool, "client@example.com", "client").await;
    let studio = common::studio(&pool, owner.id, "Loft", "Moscow").await;

    let first = ConversationRepo::find_or_create(&pool, studio.id, client.id, owner.id)
        .await
        .unwrap();
    let second = ConversationRepo::find_or_create(&pool, studio.id, client.id, owner.id)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unread_counts_are_per_reader(pool: PgPool) {
    let owner = common::user(&pool, "owner@example.com", "owner").await;
    let client = common::user(&pool, "client@example.com", "client").await;
    let studio = common::studio(&pool, owner.id, "Loft", "Moscow").await;
    let conversation = ConversationRepo::find_or_create(&pool, studio.id, client.id, owner.id)
        .await
        .unwrap();

    MessageRepo::create(&pool, conversation.id, client.id, "Is the loft free on Friday?")
        .await
        .unwrap();
    MessageRepo::create(&pool, conversation.id, client.id, "Evening preferably")
        .await
        .unwrap();

    let owner_inbox = ConversationRepo::list_for_user(&pool, owner.id, 20, 0).await.unwrap();
    assert_eq!(owner_inbox.len(), 1);
    assert_eq!(owner_inbox[0].unread_count, 2);
    assert_eq!(owner_inbox[0].last_message.as_deref(), Some("Evening preferably"));
    assert!(owner_inbox[0].last_message_at.is_some());

    let client_inbox = ConversationRepo::list_for_user(&pool, client.id, 20, 0).await.unwrap();
    assert_eq!(client_inbox[0].unread_count, 0);

    let messages = MessageRepo::list(&pool, conversation.id, 50, 0).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].body, "Is the loft free on Friday?");
    let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();

    // The sender's own messages are untouched by their read receipt.
    assert_eq!(MessageRepo::mark_read(&pool, conversation.id, client.id, &ids).await.unwrap(), 0);
    // Only the messages the reader was shown become read.
    assert_eq!(MessageRepo::mark_read(&pool, conversation.id, owner.id, &ids[..1]).await.unwrap(), 1);

    let owner_inbox = ConversationRepo::list_for_user(&pool, owner.id, 20, 0).await.unwrap();
    assert_eq!(owner_inbox[0].unread_count, 1);

    assert_eq!(MessageRepo::mark_read(&pool, conversation.id, owner.id, &ids).await.unwrap(), 1);
    assert_eq!(MessageRepo::mark_read(&pool, conversation.id, owner.id, &[]).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn notifications_are_scoped_to_their_user(pool: PgPool) {
    let alice = common::user(&pool, "alice@example.com", "client").await;
    let bob = common::user(&pool, "bob@example.com", "client").await;

    let note = NotificationRepo::create(
        &pool,
        &CreateNotification {
            user_id: alice.id,
            kind: "booking.confirmed".into(),
            title: "Booking confirmed".into(),
            body: "See you soon".into(),
            link: Some("/bookings/1".into()),
        },
    )
    .await
    .unwrap();

    assert_eq!(NotificationRepo::unread_count(&pool, alice.id).await.unwrap(), 1);
    assert!(!NotificationRepo::mark_read(&pool, note.id, bob.id).await.unwrap());
    assert!(NotificationRepo::mark_read(&pool, note.id, alice.id).await.unwrap());
    assert_eq!(NotificationRepo::unread_count(&pool, alice.id).await.unwrap(), 0);

    let unread = NotificationRepo::list_for_user(&pool, alice.id, true, 20, 0).await.unwrap();
    assert!(unread.is_empty());
    let all = NotificationRepo::list_for_user(&pool, alice.id, false, 20, 0).await.unwrap();
    assert_eq!(all.len(), 1);
}
