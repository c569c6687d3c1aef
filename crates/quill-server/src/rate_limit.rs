//! Per-IP fixed-window rate limiting.
//!
//! Each client IP gets a counter that resets when its window elapses; a
//! request past the limit is answered with 429 and the standard error
//! envelope. Defaults allow 100 requests per 15 minutes.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Record one request from `ip` and report whether it is allowed.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let entry = windows.entry(ip).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        entry.count += 1;
        entry.count <= self.limit
    }

    /// Drop windows whose reset point has passed.
    pub async fn purge_stale(&self) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let window = self.window;
        windows.retain(|_, w| now.duration_since(w.started) < window);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(15 * 60))
    }
}

pub async fn rate_limit_middleware(
    axum::extract::State(limiter): axum::extract::State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&req);

    if let Some(ip) = ip {
        if !limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            let body = serde_json::json!({
                "code": "RATE_LIMITED",
                "message": "Too many requests, please try again later",
            });
            return (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
        }
    }

    next.run(req).await
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limit_is_enforced_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(limiter.check(ip).await);
        }
        assert!(!limiter.check(ip).await);
    }

    #[tokio::test]
    async fn window_reset_clears_the_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limiter.check(ip).await);
        assert!(!limiter.check(ip).await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(limiter.check(ip).await);
    }

    #[tokio::test]
    async fn ips_are_tracked_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(ip1).await);
        assert!(!limiter.check(ip1).await);
        assert!(limiter.check(ip2).await);
    }

    #[tokio::test]
    async fn purge_drops_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(1));
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(limiter.check(ip).await);

        tokio::time::sleep(Duration::from_millis(5)).await;
        limiter.purge_stale().await;

        let windows = limiter.windows.lock().await;
        assert!(windows.is_empty());
    }
}
