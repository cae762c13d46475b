//! Fixed-window rate limiting per client IP
//!
//! Each request increments `rate_limit:<client_ip>` in the cache. The first
//! increment of a window starts its expiry; once the counter passes the
//! configured limit, requests get 429 until the key expires.
//!
//! # Client Identity
//!
//! The first address in `X-Forwarded-For` when present, otherwise the peer
//! address from `ConnectInfo`, otherwise the shared bucket `unknown`.
//!
//! # Headers
//!
//! - `X-RateLimit-Limit`: requests allowed per window
//! - `X-RateLimit-Remaining`: requests left in the current window
//! - `X-RateLimit-Reset`: seconds until the window ends (upper bound)
//! - `Retry-After`: seconds to wait (429 responses only)
//!
//! A cache failure lets the request through without headers.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use taskboard_shared::cache::{keys, CacheBackend};

/// Rate limiting middleware layer
///
/// # Errors
///
/// - 429 Too Many Requests: limit exceeded for this client
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let limit = state.config.rate_limit.requests_per_window;
    let window = state.config.rate_limit.window;
    let client = client_ip(&request);

    let count = match state
        .cache
        .increment(&keys::rate_limit(&client), window)
        .await
    {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "rate limiter unavailable, allowing request");
            return next.run(request).await;
        }
    };

    let reset = window.as_secs().max(1);
    let remaining = i64::from(limit).saturating_sub(count).max(0) as u64;

    if count > i64::from(limit) {
        tracing::warn!(client = %client, count, limit, "rate limit exceeded");

        let mut response = ApiError::RateLimitExceeded {
            retry_after: reset,
            message: format!("Rate limit of {} requests per window exceeded", limit),
        }
        .into_response();
        insert_headers(response.headers_mut(), limit, 0, reset);
        return response;
    }

    let mut response = next.run(request).await;
    insert_headers(response.headers_mut(), limit, remaining, reset);
    response
}

/// Best-effort client address for bucketing
pub fn client_ip(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn insert_headers(headers: &mut HeaderMap, limit: u32, remaining: u64, reset: u64) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_from_connect_info() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_ip(&request), "192.0.2.1");
    }

    #[test]
    fn test_client_ip_unknown() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }
}
