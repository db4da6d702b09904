//! Sliding-window throttle for login attempts, keyed by client IP.

use crate::error::AppError;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const LOGIN_ATTEMPTS: usize = 5;
pub const LOGIN_WINDOW_SECS: u64 = 60;

// Past this many tracked clients, expired entries are swept on the next check.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Clone)]
pub struct RateLimiter {
    attempts: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn for_login() -> Self {
        Self::new(LOGIN_ATTEMPTS, LOGIN_WINDOW_SECS)
    }

    /// Records an attempt and reports whether it is still within the limit.
    pub async fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;

        if attempts.len() > SWEEP_THRESHOLD {
            let window = self.window;
            attempts.retain(|_, history| {
                history.retain(|&at| now.duration_since(at) < window);
                !history.is_empty()
            });
        }

        let history = attempts.entry(client.to_string()).or_default();
        history.retain(|&at| now.duration_since(at) < self.window);

        if history.len() < self.max_attempts {
            history.push(now);
            true
        } else {
            false
        }
    }

    pub async fn tracked_clients(&self) -> usize {
        self.attempts.read().await.len()
    }
}

/// Route layer that rejects requests from clients over the limit.
pub async fn throttle(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip().to_string();

    if !limiter.check(&ip).await {
        tracing::warn!("Login throttled for {}", ip);
        return AppError::RateLimited.into_response();
    }

    next.run(request).await
}
