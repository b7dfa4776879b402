//! Shared query parameter types for API handlers.

use serde::Deserialize;
use studiora_core::catalog::{clamp_limit, clamp_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// `(limit, offset)` clamped to the listing bounds.
    pub fn clamped(&self) -> (i64, i64) {
        (
            clamp_limit(self.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE),
            clamp_offset(self.offset),
        )
    }
}
