//! Studiora domain logic.
//!
//! Pure rules shared by the repository layer and the HTTP server: error
//! type, id aliases, roles, the booking state machine and time-range rules,
//! payment status reconciliation, promotion plans, review rules and catalog
//! query parsing. Nothing in this crate performs I/O.

pub mod booking;
pub mod catalog;
pub mod error;
pub mod payment;
pub mod promotion;
pub mod review;
pub mod roles;
pub mod types;
