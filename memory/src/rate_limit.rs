//! Fixed-window request limiter keyed by caller identity.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_MAX_REQUESTS: u32 = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Windows are dropped once this many identifiers are tracked and theirs has expired.
const PRUNE_THRESHOLD: usize = 1024;

pub struct RateLimiter {
    /// identifier → (count, window_start)
    windows: Mutex<HashMap<String, (u32, Instant)>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// `max_requests == 0` disables limiting.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    pub async fn check(&self, identifier: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        if windows.len() >= PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, (_, start)| now.duration_since(*start) < window);
        }

        let entry = windows.entry(identifier.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }
        if entry.0 >= self.max_requests {
            debug!(identifier, "rate limited");
            false
        } else {
            entry.0 += 1;
            true
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}
