//! Governor-based rate limiting middleware.
//!
//! Guards the credential endpoints (login, register) with a per-process
//! quota taken from `auth.login_rate_per_minute`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;

/// A shared rate limiter instance.
pub type SharedLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(30) {
    Some(n) => n,
    None => unreachable!(),
};

/// Create a rate limiter with the given requests-per-minute quota. Zero falls
/// back to 30 per minute.
pub fn create_limiter(requests_per_minute: u32) -> SharedLimiter {
    let quota =
        Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(DEFAULT_PER_MINUTE));
    Arc::new(RateLimiter::direct(quota))
}

/// Rate limiting middleware. Returns 429 Too Many Requests when exceeded.
pub async fn rate_limit_middleware(
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let limiter = request.extensions().get::<SharedLimiter>().cloned();

    if let Some(limiter) = limiter {
        if limiter.check().is_err() {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            return Err((
                axum::http::StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many attempts, try again later",
                    "code": "rate_limited",
                    "request_id": super::request_id::current_request_id(),
                })),
            )
                .into_response());
        }
    }

    Ok(next.run(request).await)
}
