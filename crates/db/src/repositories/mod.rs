//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod booking_repo;
pub mod conversation_repo;
pub mod message_repo;
pub mod notification_repo;
pub mod payment_repo;
pub mod promotion_repo;
pub mod review_repo;
pub mod room_repo;
pub mod session_repo;
pub mod studio_repo;
pub mod user_repo;

pub use booking_repo::{BookingRepo, CreateBookingOutcome};
pub use conversation_repo::ConversationRepo;
pub use message_repo::MessageRepo;
pub use notification_repo::NotificationRepo;
pub use payment_repo::{BookingCheckout, PaymentRepo};
pub use promotion_repo::PromotionRepo;
pub use review_repo::ReviewRepo;
pub use room_repo::RoomRepo;
pub use session_repo::SessionRepo;
pub use studio_repo::StudioRepo;
pub use user_repo::UserRepo;
