//! Inbound request rate limiting.
//!
//! A sliding window per client IP and path. A request over the limit is
//! held until a slot frees up instead of being rejected, so bursts reach
//! the search engines spread out over the window.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Sliding-window limiter keyed by arbitrary strings.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    period: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Admits `max_requests` per `period` for each key.
    pub fn new(max_requests: usize, period: Duration) -> Self {
        info!(
            "Rate limiter configured: {} requests per {:?}",
            max_requests, period
        );
        Self {
            max_requests: max_requests.max(1),
            period,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next slot for `key` and returns how long the caller
    /// must wait before using it.
    pub async fn acquire(&self, key: &str) -> Duration {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        // Drop keys whose newest slot has aged out; their windows are empty.
        windows.retain(|_, window| window.back().is_some_and(|&last| last + self.period > now));

        let window = windows.entry(key.to_string()).or_default();

        while let Some(&first) = window.front() {
            if first + self.period <= now {
                window.pop_front();
            } else {
                break;
            }
        }

        // Slots are kept in ascending order, so the slot that must age out
        // before this request is `max_requests` places from the back.
        let slot = if window.len() < self.max_requests {
            now
        } else {
            (window[window.len() - self.max_requests] + self.period).max(now)
        };
        window.push_back(slot);

        slot.saturating_duration_since(now)
    }

    /// Waits until `key` may proceed.
    pub async fn wait(&self, key: &str) {
        let delay = self.acquire(key).await;
        if !delay.is_zero() {
            warn!("Rate limit exceeded for {}. Waiting {:?} before processing request.", key, delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Number of keys with a live window.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }

    /// Requests `key` may still make without waiting.
    pub async fn remaining(&self, key: &str) -> usize {
        let windows = self.windows.lock().await;
        let now = Instant::now();
        let used = windows
            .get(key)
            .map(|w| w.iter().filter(|&&t| t + self.period > now).count())
            .unwrap_or(0);
        self.max_requests.saturating_sub(used)
    }
}

/// Axum middleware limiting requests per client IP and path.
///
/// Mounted with `route_layer`, so only matched routes reach it.
pub async fn limit_search_requests(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("{}:{}", client, request.uri().path());
    limiter.wait(&key).await;
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admits_within_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert_eq!(limiter.acquire("1.2.3.4:/search").await, Duration::ZERO);
        }
        assert_eq!(limiter.remaining("1.2.3.4:/search").await, 0);
    }

    #[tokio::test]
    async fn test_over_limit_waits_for_oldest_slot() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.acquire("k").await;
        limiter.acquire("k").await;

        let third = limiter.acquire("k").await;
        assert!(third > Duration::from_secs(59));
        assert!(third <= Duration::from_secs(60));

        // The fourth request queues behind the third, one full window after
        // the second.
        let fourth = limiter.acquire("k").await;
        assert!(fourth > Duration::from_secs(59));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.acquire("a:/x").await, Duration::ZERO);
        assert_eq!(limiter.acquire("b:/x").await, Duration::ZERO);
        assert_eq!(limiter.acquire("a:/y").await, Duration::ZERO);
        assert!(limiter.acquire("a:/x").await > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_window_expires() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        limiter.acquire("k").await;
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert_eq!(limiter.acquire("k").await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_wait_delays_excess_request() {
        let limiter = RateLimiter::new(1, Duration::from_millis(80));
        limiter.wait("k").await;
        let start = std::time::Instant::now();
        limiter.wait("k").await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_expired_keys_are_evicted() {
        let limiter = RateLimiter::new(10, Duration::from_millis(20));
        for i in 0..500 {
            limiter.acquire(&format!("1.2.3.4:/api/v1/search/junk-{}", i)).await;
        }
        assert!(limiter.tracked_keys().await > 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        limiter.acquire("1.2.3.4:/api/v1/search/simple-search").await;
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_live_keys_survive_sweep() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        limiter.acquire("a").await;
        limiter.acquire("b").await;
        assert_eq!(limiter.tracked_keys().await, 2);
        assert_eq!(limiter.remaining("a").await, 9);
    }

    #[tokio::test]
    async fn test_remaining_for_unknown_key() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        assert_eq!(limiter.remaining("nobody").await, 5);
    }
}
