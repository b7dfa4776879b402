//! Studiora event bus and notification infrastructure.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] -- the canonical domain event envelope.
//! - [`content`] -- notification text for each event kind.
//! - [`delivery`] -- external delivery channels (email).
//! - [`NotificationRouter`] -- background subscriber writing in-app
//!   notifications.

pub mod bus;
pub mod content;
pub mod delivery;
pub mod router;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use router::NotificationRouter;
