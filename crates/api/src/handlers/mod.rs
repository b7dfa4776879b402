pub mod auth;
pub mod bookings;
pub mod conversations;
pub mod notifications;
pub mod payments;
pub mod promotions;
pub mod reviews;
pub mod rooms;
pub mod studios;
