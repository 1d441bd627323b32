//! Rate limiter for login attempts
//!
//! Two sliding windows guard the login endpoint:
//! - failed attempts per email address (5 per 15 minutes)
//! - requests per client IP (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Failed attempts allowed per email inside [`EMAIL_WINDOW_MINUTES`]
pub const MAX_FAILED_ATTEMPTS: usize = 5;
pub const EMAIL_WINDOW_MINUTES: i64 = 15;
/// Login requests allowed per IP inside [`IP_WINDOW_MINUTES`]
pub const MAX_IP_REQUESTS: usize = 10;
pub const IP_WINDOW_MINUTES: i64 = 1;

/// Login rate limiter
pub struct LoginRateLimiter {
    /// Failed login attempts by lowercase email
    email_attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    /// Requests by client IP
    ip_attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            email_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether the email has used up its failed attempts
    pub async fn is_email_limited(&self, email: &str) -> bool {
        let mut attempts = self.email_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(EMAIL_WINDOW_MINUTES);

        let email_attempts = attempts.entry(email.to_lowercase()).or_default();
        email_attempts.retain(|time| *time > cutoff);

        email_attempts.len() >= MAX_FAILED_ATTEMPTS
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        let mut attempts = self.email_attempts.write().await;
        attempts
            .entry(email.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Forget failed attempts after a successful login
    pub async fn clear_email_attempts(&self, email: &str) {
        self.email_attempts.write().await.remove(&email.to_lowercase());
    }

    /// Whether the IP has used up its request budget
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.ip_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(IP_WINDOW_MINUTES);

        let ip_attempts = attempts.entry(ip).or_default();
        ip_attempts.retain(|time| *time > cutoff);

        ip_attempts.len() >= MAX_IP_REQUESTS
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ip_attempts
            .write()
            .await
            .entry(ip)
            .or_default()
            .push(Utc::now());
    }

    /// Drop expired entries; run periodically
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let email_cutoff = now - Duration::minutes(EMAIL_WINDOW_MINUTES);
        let ip_cutoff = now - Duration::minutes(IP_WINDOW_MINUTES);

        {
            let mut attempts = self.email_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > email_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut attempts = self.ip_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }

    #[cfg(test)]
    async fn tracked_emails(&self) -> usize {
        self.email_attempts.read().await.len()
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_email_rate_limit() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..MAX_FAILED_ATTEMPTS - 1 {
            assert!(!limiter.is_email_limited("ali@example.com").await);
            limiter.record_failed_attempt("ali@example.com").await;
        }
        limiter.record_failed_attempt("ali@example.com").await;
        assert!(limiter.is_email_limited("ali@example.com").await);

        limiter.clear_email_attempts("ali@example.com").await;
        assert!(!limiter.is_email_limited("ali@example.com").await);
    }

    #[tokio::test]
    async fn test_ip_rate_limit() {
        let limiter = LoginRateLimiter::new();
        let ip = IpAddr::from_str("127.0.0.1").unwrap();
        let other = IpAddr::from_str("10.0.0.2").unwrap();

        for _ in 0..MAX_IP_REQUESTS {
            assert!(!limiter.is_ip_limited(ip).await);
            limiter.record_ip_request(ip).await;
        }

        assert!(limiter.is_ip_limited(ip).await);
        assert!(!limiter.is_ip_limited(other).await);
    }

    #[tokio::test]
    async fn test_email_is_case_insensitive() {
        let limiter = LoginRateLimiter::new();

        limiter.record_failed_attempt("Ali@Example.com").await;
        limiter.record_failed_attempt("ali@example.com").await;
        limiter.record_failed_attempt("ALI@EXAMPLE.COM").await;
        limiter.record_failed_attempt("ali@example.com").await;
        assert!(!limiter.is_email_limited("ali@example.com").await);

        limiter.record_failed_attempt("ali@example.com").await;
        assert!(limiter.is_email_limited("Ali@example.COM").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_empty_entries() {
        let limiter = LoginRateLimiter::new();
        // Checking an unknown email creates an empty entry
        assert!(!limiter.is_email_limited("nobody@example.com").await);
        limiter.record_failed_attempt("someone@example.com").await;

        limiter.cleanup().await;

        assert_eq!(limiter.tracked_emails().await, 1);
    }
}
