use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

/// Fixed-window limiter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_window: u64,
    window: Duration,
    entries: DashMap<String, (u64, Instant)>,
}

impl RateLimiter {
    pub fn new(requests_per_window: u64, window: Duration) -> Self {
        Self {
            requests_per_window,
            window,
            entries: DashMap::new(),
        }
    }

    pub fn per_second(requests: u64) -> Self {
        Self::new(requests, Duration::from_secs(1))
    }

    /// Counts one request for `key` and says whether it is within budget.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) >= self.window {
            *entry = (1, now);
        } else {
            entry.0 += 1;
        }

        entry.0 <= self.requests_per_window
    }

    /// Drops windows that have already expired.
    pub fn prune(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, started)| now.duration_since(*started) < self.window);
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    match ip {
        Some(ip) => {
            if !limiter.check(&ip) {
                tracing::warn!(section = "http", action = "rate_limited", ip = %ip);
                return Err(StatusCode::TOO_MANY_REQUESTS);
            }
        }
        None => {
            tracing::debug!(section = "http", action = "rate_limit_skipped", "client address unavailable");
        }
    }

    Ok(next.run(request).await)
}
