//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and the registration policy.
//! - [`jwt`] -- access-token signing/validation and refresh-token helpers.

pub mod jwt;
pub mod password;
