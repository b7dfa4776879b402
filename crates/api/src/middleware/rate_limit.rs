//! Rate-limit middleware for the `/api/v1` tree.
//!
//! Mounted with `axum::middleware::from_fn_with_state`. Requests under
//! `/auth/` count against a separate, smaller bucket.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, OriginalUri, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::rate_limit::{Bucket, Decision};
use crate::state::AppState;

const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|u| u.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let ip = client_ip(request.headers(), peer);

    let bucket = if is_auth_path(&path) {
        Bucket::Auth
    } else {
        Bucket::Api
    };

    match state.rate_limiter.check(bucket, &ip) {
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert(REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after } => {
            tracing::warn!(%ip, bucket = bucket.as_str(), path = %path, "Rate limit exceeded");
            AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
    }
}

fn is_auth_path(path: &str) -> bool {
    path.trim_start_matches("/api/v1").starts_with("/auth/")
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
