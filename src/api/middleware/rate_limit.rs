use crate::AppState;
use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde_json::json;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Fixed-window request counter keyed by client address
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    hits: DashMap<String, WindowState>,
}

struct WindowState {
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            hits: DashMap::new(),
        }
    }

    /// Counts one request for `key`; false means the window budget is spent
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.hits.entry(key.to_string()).or_insert(WindowState {
            window_start: now,
            count: 0,
        });

        if now.duration_since(entry.window_start) >= self.window {
            entry.window_start = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

fn client_key(req: &Request) -> String {
    // Prefer the proxy-supplied address; fall back to the socket peer
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req);
    if !state.rate_limiter.try_acquire(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "message": "Too many requests from this IP, please try again later."
            })),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_counts_per_key() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        assert!(limiter.try_acquire("10.0.0.1"));
        assert!(limiter.try_acquire("10.0.0.1"));
        assert!(!limiter.try_acquire("10.0.0.1"));

        // Other clients keep their own budget
        assert!(limiter.try_acquire("10.0.0.2"));
    }

    #[test]
    fn test_limiter_resets_after_window() {
        let limiter = RateLimiter::new(Duration::ZERO, 1);
        assert!(limiter.try_acquire("10.0.0.1"));
        // Zero-length window: every call starts a fresh one
        assert!(limiter.try_acquire("10.0.0.1"));
    }
}
