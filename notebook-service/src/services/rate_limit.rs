//! Per-email send throttling for one-time codes.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Refused; retry after the given number of seconds.
    Refused { retry_after: u64 },
}

/// Send-throttle seam for code issuance.
///
/// The default implementation is a process-lifetime map: limits are enforced
/// per process and reset on restart (fail open). A shared TTL-capable store
/// can be injected instead without touching the issuance flow.
pub trait OtpRateLimiter: Send + Sync {
    /// Check whether a send to `email` is currently allowed.
    fn check(&self, email: &str, now: DateTime<Utc>) -> RateDecision;

    /// Record a completed send to `email`.
    fn record_send(&self, email: &str, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy)]
struct RateLimitBucket {
    last_sent_at: DateTime<Utc>,
    count_24h: u32,
    window_start: DateTime<Utc>,
}

/// In-process limiter keyed by email.
///
/// The 24h window resets wholesale once `now - window_start` exceeds 24h
/// rather than sliding, so up to `2 * daily_cap` sends can cluster around a
/// window boundary.
pub struct InMemoryOtpLimiter {
    buckets: DashMap<String, RateLimitBucket>,
    min_interval: Duration,
    daily_cap: u32,
}

const WINDOW: i64 = 24 * 60 * 60;

impl InMemoryOtpLimiter {
    pub fn new(min_interval_seconds: i64, daily_cap: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            min_interval: Duration::seconds(min_interval_seconds),
            daily_cap,
        }
    }
}

impl OtpRateLimiter for InMemoryOtpLimiter {
    fn check(&self, email: &str, now: DateTime<Utc>) -> RateDecision {
        let mut entry = match self.buckets.get_mut(email) {
            Some(entry) => entry,
            None => return RateDecision::Allowed,
        };

        // Reset the 24h window if it has lapsed
        if now - entry.window_start > Duration::seconds(WINDOW) {
            entry.window_start = now;
            entry.count_24h = 0;
        }

        let since_last = now - entry.last_sent_at;
        if since_last < self.min_interval {
            let retry_after = (self.min_interval - since_last).num_seconds().max(1) as u64;
            return RateDecision::Refused { retry_after };
        }

        if entry.count_24h >= self.daily_cap {
            let window_ends = entry.window_start + Duration::seconds(WINDOW);
            let retry_after = (window_ends - now).num_seconds().max(1) as u64;
            return RateDecision::Refused { retry_after };
        }

        RateDecision::Allowed
    }

    fn record_send(&self, email: &str, now: DateTime<Utc>) {
        let mut entry = self
            .buckets
            .entry(email.to_string())
            .or_insert(RateLimitBucket {
                last_sent_at: now,
                count_24h: 0,
                window_start: now,
            });

        if now - entry.window_start > Duration::seconds(WINDOW) {
            entry.window_start = now;
            entry.count_24h = 0;
        }

        entry.last_sent_at = now;
        entry.count_24h += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: &str = "user@example.com";

    #[test]
    fn first_send_is_allowed() {
        let limiter = InMemoryOtpLimiter::new(60, 5);
        assert_eq!(limiter.check(EMAIL, Utc::now()), RateDecision::Allowed);
    }

    #[test]
    fn refuses_within_minimum_interval() {
        let limiter = InMemoryOtpLimiter::new(60, 5);
        let t0 = Utc::now();
        limiter.record_send(EMAIL, t0);

        match limiter.check(EMAIL, t0 + Duration::seconds(30)) {
            RateDecision::Refused { retry_after } => assert_eq!(retry_after, 30),
            other => panic!("expected refusal, got {:?}", other),
        }

        // At exactly 60s the next send is allowed again
        assert_eq!(
            limiter.check(EMAIL, t0 + Duration::seconds(60)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn refuses_sixth_send_within_daily_window() {
        let limiter = InMemoryOtpLimiter::new(60, 5);
        let t0 = Utc::now();

        for i in 0..5 {
            let t = t0 + Duration::seconds(i * 120);
            assert_eq!(limiter.check(EMAIL, t), RateDecision::Allowed);
            limiter.record_send(EMAIL, t);
        }

        // 60s spacing respected, but the daily cap is hit
        let sixth = t0 + Duration::seconds(5 * 120);
        assert!(matches!(
            limiter.check(EMAIL, sixth),
            RateDecision::Refused { .. }
        ));
    }

    #[test]
    fn daily_window_resets_after_24h() {
        let limiter = InMemoryOtpLimiter::new(60, 5);
        let t0 = Utc::now();

        for i in 0..5 {
            limiter.record_send(EMAIL, t0 + Duration::seconds(i * 120));
        }

        let next_day = t0 + Duration::hours(24) + Duration::seconds(601);
        assert_eq!(limiter.check(EMAIL, next_day), RateDecision::Allowed);
    }

    #[test]
    fn limits_are_per_email() {
        let limiter = InMemoryOtpLimiter::new(60, 5);
        let t0 = Utc::now();
        limiter.record_send("a@example.com", t0);

        assert_eq!(
            limiter.check("b@example.com", t0 + Duration::seconds(1)),
            RateDecision::Allowed
        );
    }
}
