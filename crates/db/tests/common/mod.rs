//! Fixture builders shared by the db integration tests.

#![allow(dead_code)]

use chrono::{Duration, DurationRound, Utc};
use sqlx::PgPool;
use studiora_core::types::{DbId, Timestamp};
use studiora_db::models::booking::NewBooking;
use studiora_db::models::room::{CreateRoom, Room};
use studiora_db::models::studio::{CreateStudio, Studio};
use studiora_db::models::user::{CreateUser, User};
use studiora_db::repositories::{RoomRepo, StudioRepo, UserRepo};

pub async fn user(pool: &PgPool, email: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: format!("User {email}"),
            phone: None,
            password_hash: "not-a-real-hash".to_string(),
            role: role.to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn studio(pool: &PgPool, owner_id: DbId, name: &str, city: &str) -> Studio {
    StudioRepo::create(
        pool,
        owner_id,
        &CreateStudio {
            name: name.to_string(),
            description: None,
            city: city.to_string(),
            address: "1 Test street".to_string(),
            phone: None,
            image_urls: None,
        },
    )
    .await
    .unwrap()
}

pub async fn room(pool: &PgPool, studio_id: DbId, hourly_price: i64, capacity: i32) -> Room {
    RoomRepo::create(
        pool,
        studio_id,
        &CreateRoom {
            name: format!("Hall {hourly_price}"),
            description: None,
            area_sqm: Some(60),
            capacity: Some(capacity),
            hourly_price,
            image_urls: None,
        },
    )
    .await
    .unwrap()
}

/// A whole hour a few days from now, so slots never fall in the past.
pub fn base_time() -> Timestamp {
    (Utc::now() + Duration::days(3))
        .duration_trunc(Duration::hours(1))
        .unwrap()
}

pub fn new_booking(room_id: DbId, client_id: DbId, start: Timestamp, hours: i64) -> NewBooking {
    NewBooking {
        room_id,
        client_id,
        starts_at: start,
        ends_at: start + Duration::hours(hours),
        total_price: 100_000 * hours,
        comment: None,
    }
}
