//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts (validated with `validator`)
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod booking;
pub mod conversation;
pub mod notification;
pub mod payment;
pub mod promotion;
pub mod review;
pub mod room;
pub mod session;
pub mod studio;
pub mod user;
