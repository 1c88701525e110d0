//! Brute-force guard for the token endpoint
//!
//! Failed credential checks are counted per key (the lowercased email).
//! Once a key reaches the limit inside the window it is banned for the ban
//! duration. A successful login clears the count.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Failed logins that trigger a ban inside one window
    pub max_attempts: u32,
    /// Window length
    pub window: Duration,
    /// How long a key stays banned
    pub ban_duration: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(300),
            ban_duration: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug)]
struct Attempts {
    count: u32,
    window_start: Instant,
    banned_until: Option<Instant>,
}

/// Per-key attempt counter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, Attempts>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether requests for `key` must be refused right now
    pub async fn is_banned(&self, key: &str) -> bool {
        self.is_banned_at(key, Instant::now()).await
    }

    /// Count a failed credential check against `key`
    pub async fn record_failure(&self, key: &str) {
        self.record_failure_at(key, Instant::now()).await
    }

    /// Forget the failures of `key` after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(&key.to_lowercase());
    }

    async fn is_banned_at(&self, key: &str, now: Instant) -> bool {
        let key = key.to_lowercase();
        let mut entries = self.entries.lock().await;

        match entries.get(&key).and_then(|entry| entry.banned_until) {
            Some(until) if now < until => true,
            Some(_) => {
                entries.remove(&key);
                false
            }
            None => false,
        }
    }

    async fn record_failure_at(&self, key: &str, now: Instant) {
        let key = key.to_lowercase();
        let mut entries = self.entries.lock().await;

        let entry = entries.entry(key.clone()).or_insert(Attempts {
            count: 0,
            window_start: now,
            banned_until: None,
        });

        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        if entry.count >= self.config.max_attempts {
            entry.banned_until = Some(now + self.config.ban_duration);
            warn!(
                "Too many failed logins for {}, banned for {:?}",
                key, self.config.ban_duration
            );
        }
    }
}
