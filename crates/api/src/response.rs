//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Paged listings add a
//! `meta` block.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": [...], "meta": { total, limit, offset } }` for paged listings.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
