//! Tests for the periodic booking lifecycle sweep.

mod common;

use axum::http::StatusCode;
use common::{body_json, book, register, slot_start, studio_with_room};
use sqlx::PgPool;
use studiora_api::background::booking_lifecycle;
use studiora_core::booking::BookingStatus;
use studiora_db::repositories::BookingRepo;
use studiora_events::bus::{BOOKING_CANCELLED, BOOKING_COMPLETED};
use studiora_events::EventBus;

const TIMEOUT_MINS: i32 = 30;

async fn booking(app: axum::Router, days: i64) -> i64 {
    let owner = register(app.clone(), &format!("owner{days}@example.com"), "owner").await;
    let client = register(app.clone(), &format!("client{days}@example.com"), "client").await;
    let (_, room_id) = studio_with_room(app.clone(), &owner, "Ufa", 60_000).await;
    let response = book(app, &client, room_id, slot_start(days), 2).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_expires_unpaid_bookings(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let stale = booking(app.clone(), 2).await;
    let fresh = booking(app, 3).await;

    sqlx::query("UPDATE bookings SET created_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(stale)
        .execute(&pool)
        .await
        .unwrap();

    let bus = EventBus::default();
    let mut events = bus.subscribe();

    let report = booking_lifecycle::sweep(&pool, &bus, TIMEOUT_MINS).await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.completed, 0);

    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, BOOKING_CANCELLED);
    assert_eq!(event.source_entity_id, Some(stale));

    let fresh = BookingRepo::find_by_id(&pool, fresh).await.unwrap().unwrap();
    assert_eq!(fresh.status, "pending");

    // Nothing left to do on the next pass.
    let report = booking_lifecycle::sweep(&pool, &bus, TIMEOUT_MINS).await.unwrap();
    assert_eq!(report.expired, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_completes_finished_sessions(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let id = booking(app, 2).await;
    BookingRepo::transition(&pool, id, BookingStatus::Pending, BookingStatus::Confirmed)
        .await
        .unwrap()
        .unwrap();
    sqlx::query(
        "UPDATE bookings SET starts_at = starts_at - INTERVAL '3 days',
                             ends_at = ends_at - INTERVAL '3 days'
         WHERE id = $1",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();

    let bus = EventBus::default();
    let mut events = bus.subscribe();

    let report = booking_lifecycle::sweep(&pool, &bus, TIMEOUT_MINS).await.unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(events.try_recv().unwrap().event_type, BOOKING_COMPLETED);

    let booking = BookingRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(booking.status, "completed");
}
