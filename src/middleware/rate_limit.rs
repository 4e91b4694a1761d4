//! Fixed-window rate limiting per client key.
//!
//! Counters live in a [`RateLimitStore`] handed to the middleware at
//! construction. Routers that should share budgets share a store; nothing is
//! process-global.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::handler::Next;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

use super::Middleware;

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Requests admitted per key per window.
    pub limit: u64,
    pub window: Duration,
    /// Status and body of the rejection.
    pub status: StatusCode,
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "429 - Too Many Requests".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u64,
    started: Instant,
    length: Duration,
}

impl Window {
    fn new(started: Instant, length: Duration) -> Self {
        Self { count: 0, started, length }
    }

    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.length
    }
}

#[derive(Debug, Default)]
struct Windows {
    by_key: HashMap<String, Window>,
    swept: Option<Instant>,
}

impl Windows {
    /// Drops every expired window. Returns how many went.
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.by_key.len();
        self.by_key.retain(|_, w| !w.expired(now));
        self.swept = Some(now);
        before - self.by_key.len()
    }
}

/// Shared counters, one mutex for the whole map.
///
/// Expired windows are swept out at most once per window length, during
/// [`check`](Self::check), so the map only holds clients seen recently.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    windows: Mutex<Windows>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one request for `key`. Returns `false` when it is over the limit.
    ///
    /// A window that has run for `window` or longer restarts at the current
    /// instant. Rejected requests are not counted.
    pub fn check(&self, key: &str, limit: u64, window: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        if windows.swept.is_none_or(|at| now.duration_since(at) >= window) {
            let evicted = windows.sweep(now);
            if evicted > 0 {
                debug!(evicted, remaining = windows.by_key.len(), "rate limit: swept expired windows");
            }
        }

        let entry = windows
            .by_key
            .entry(key.to_owned())
            .or_insert(Window::new(now, window));
        if now.duration_since(entry.started) >= window {
            *entry = Window::new(now, window);
        }
        entry.length = window;
        if entry.count >= limit {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drops expired windows now instead of waiting for the next sweep.
    /// Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.windows.lock().sweep(Instant::now())
    }

    /// Requests counted for `key` in its current window.
    pub fn count(&self, key: &str) -> u64 {
        self.windows.lock().by_key.get(key).map_or(0, |w| w.count)
    }

    /// Number of keys with a window in the store, expired or not.
    pub fn len(&self) -> usize {
        self.windows.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.lock().by_key.is_empty()
    }
}

type KeyFn = dyn Fn(&Request) -> Option<String> + Send + Sync;

/// Rejects requests beyond `limit` per `window` for the same client key.
///
/// The key defaults to the client IP taken from [`Request::remote_addr`];
/// a request without one is answered with `500`.
#[derive(Clone)]
pub struct RateLimit {
    config: Arc<RateLimitConfig>,
    store: Arc<RateLimitStore>,
    key: Arc<KeyFn>,
}

impl RateLimit {
    pub fn new(config: RateLimitConfig, store: Arc<RateLimitStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            key: Arc::new(|req: &Request| req.remote_addr().map(|a| a.ip().to_string())),
        }
    }

    /// Keys clients by something other than their IP (an API key header, a
    /// user id from the context). `None` is treated like a missing address.
    pub fn key_by<F>(mut self, key: F) -> Self
    where
        F: Fn(&Request) -> Option<String> + Send + Sync + 'static,
    {
        self.key = Arc::new(key);
        self
    }

    fn admit(&self, req: &Request) -> Result<(), Response> {
        let Some(key) = (self.key)(req) else {
            error!(path = req.path(), "rate limit: no client key for request");
            return Err(Response::internal_error());
        };
        if self.store.check(&key, self.config.limit, self.config.window) {
            Ok(())
        } else {
            warn!(client = %key, "rate limit exceeded");
            Err((self.config.status, self.config.message.clone()).into_response())
        }
    }
}

impl Middleware for RateLimit {
    fn wrap(&self, next: Next) -> Next {
        let limiter = self.clone();
        Next::new(move |req: Request| {
            // Decided before the inner chain runs; the lock is never held
            // across it.
            let admitted = limiter.admit(&req);
            let next = next.clone();
            async move {
                match admitted {
                    Ok(()) => next.run(req).await,
                    Err(rejection) => rejection,
                }
            }
        })
    }
}
