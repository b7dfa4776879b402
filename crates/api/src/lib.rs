//! Studiora API server library.
//!
//! Exposes config, state, error handling, routes and background jobs so the
//! binary entrypoint and the integration tests share them.

pub mod auth;
pub mod background;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod query;
pub mod rate_limit;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
