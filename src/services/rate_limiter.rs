//! Rate limiter for login attempts
//!
//! Two sliding windows guard the login endpoint:
//! - failed attempts per email (5 per 15 minutes)
//! - requests per IP address (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Timestamps of recent events per key, bounded by a window length.
struct SlidingWindow<K> {
    limit: usize,
    window: Duration,
    events: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Time until `key` drops back under the limit, `None` when it is not limited
    async fn retry_after(&self, key: &K) -> Option<Duration> {
        let now = Utc::now();
        let cutoff = now - self.window;
        let events = self.events.read().await;
        // Events are recorded in time order
        let recent: Vec<&DateTime<Utc>> = events.get(key)?.iter().filter(|t| **t > cutoff).collect();
        if recent.len() < self.limit {
            return None;
        }
        let releasing = *recent[recent.len() - self.limit];
        Some(releasing + self.window - now)
    }

    async fn record(&self, key: K) {
        let now = Utc::now();
        let cutoff = now - self.window;
        let mut events = self.events.write().await;
        let times = events.entry(key).or_default();
        times.retain(|t| *t > cutoff);
        times.push(now);
    }

    async fn clear(&self, key: &K) {
        self.events.write().await.remove(key);
    }

    async fn prune(&self) -> usize {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        events.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
        events.len()
    }
}

/// Login rate limiter
pub struct LoginRateLimiter {
    failed_by_email: SlidingWindow<String>,
    requests_by_ip: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            failed_by_email: SlidingWindow::new(5, Duration::minutes(15)),
            requests_by_ip: SlidingWindow::new(10, Duration::minutes(1)),
        }
    }

    /// Check if an email has too many recent failed logins
    pub async fn is_email_limited(&self, email: &str) -> bool {
        self.email_retry_after(email).await.is_some()
    }

    /// Remaining lockout of an email, if it is locked out
    pub async fn email_retry_after(&self, email: &str) -> Option<Duration> {
        self.failed_by_email.retry_after(&email.to_lowercase()).await
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        self.failed_by_email.record(email.to_lowercase()).await;
    }

    /// Forget failed attempts after a successful login
    pub async fn clear_email_attempts(&self, email: &str) {
        self.failed_by_email.clear(&email.to_lowercase()).await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ip_retry_after(ip).await.is_some()
    }

    pub async fn ip_retry_after(&self, ip: IpAddr) -> Option<Duration> {
        self.requests_by_ip.retry_after(&ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.requests_by_ip.record(ip).await;
    }

    /// Drop entries whose events have all left their window.
    /// Returns the number of keys still tracked.
    pub async fn cleanup(&self) -> usize {
        self.failed_by_email.prune().await + self.requests_by_ip.prune().await
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
