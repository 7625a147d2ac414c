//! Per-client request rate limiting.
//!
//! Every client address gets two fixed windows, one per minute and one per hour.
//! A request is admitted only while both windows have room; the minute ceiling is
//! checked first so a burst reports the short retry.
//!
//! Counters live in memory for the life of the process. They are not shared
//! between processes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_per_minute: u32,
    pub max_per_hour: u32,
    pub minute_window: Duration,
    pub hour_window: Duration,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP` when present. Only safe
    /// behind a proxy that overwrites these headers.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_minute: 60,
            max_per_hour: 1000,
            minute_window: Duration::from_secs(60),
            hour_window: Duration::from_secs(3600),
            trust_forwarded_headers: true,
        }
    }
}

/// Whether a request may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow {
        remaining_minute: u32,
        remaining_hour: u32,
    },
    Reject {
        retry_after_seconds: u64,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Request counts for one client address.
#[derive(Debug, Clone)]
pub struct ClientCounter {
    minute_count: u32,
    minute_window_start: Instant,
    hour_count: u32,
    hour_window_start: Instant,
}

impl ClientCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            minute_count: 0,
            minute_window_start: now,
            hour_count: 0,
            hour_window_start: now,
        }
    }

    pub fn minute_count(&self) -> u32 {
        self.minute_count
    }

    pub fn hour_count(&self) -> u32 {
        self.hour_count
    }

    fn admit(&mut self, now: Instant, config: &RateLimitConfig) -> Decision {
        if now.saturating_duration_since(self.minute_window_start) >= config.minute_window {
            self.minute_count = 0;
            self.minute_window_start = now;
        }
        if now.saturating_duration_since(self.hour_window_start) >= config.hour_window {
            self.hour_count = 0;
            self.hour_window_start = now;
        }

        if self.minute_count >= config.max_per_minute {
            return Decision::Reject {
                retry_after_seconds: config.minute_window.as_secs(),
            };
        }
        if self.hour_count >= config.max_per_hour {
            return Decision::Reject {
                retry_after_seconds: config.hour_window.as_secs(),
            };
        }

        self.minute_count += 1;
        self.hour_count += 1;

        Decision::Allow {
            remaining_minute: config.max_per_minute - self.minute_count,
            remaining_hour: config.max_per_hour - self.hour_count,
        }
    }

    /// Both windows have run out, so the counter holds nothing worth keeping.
    fn is_idle(&self, now: Instant, config: &RateLimitConfig) -> bool {
        now.saturating_duration_since(self.minute_window_start) >= config.minute_window
            && now.saturating_duration_since(self.hour_window_start) >= config.hour_window
    }
}

/// Dual-window rate limiter keyed by client address.
///
/// Safe to share behind an `Arc` across any number of tasks. Each counter has its
/// own lock, so clients never contend with each other.
pub struct RequestRateLimiter {
    config: RateLimitConfig,
    counters: DashMap<String, Arc<Mutex<ClientCounter>>>,
}

impl RequestRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            counters: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn admit(&self, client: &str) -> Decision {
        self.admit_at(client, Instant::now())
    }

    /// Admit a request as if it arrived at `now`.
    pub fn admit_at(&self, client: &str, now: Instant) -> Decision {
        // Clone the Arc so the map shard is unlocked before the counter is locked
        let counter = self
            .counters
            .entry(client.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ClientCounter::new(now))))
            .clone();

        let decision = counter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .admit(now, &self.config);

        if let Decision::Reject {
            retry_after_seconds,
        } = decision
        {
            tracing::debug!(client, retry_after_seconds, "Request rate limited");
        }

        decision
    }

    /// Number of client addresses currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }

    /// Drop counters whose windows have all elapsed as of `now`.
    ///
    /// # Returns
    ///
    /// The number of counters removed.
    pub fn prune_idle_at(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, counter| {
            !counter
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_idle(now, &self.config)
        });
        before.saturating_sub(self.counters.len())
    }

    pub fn prune_idle(&self) -> usize {
        self.prune_idle_at(Instant::now())
    }
}

impl Default for RequestRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: &str = "203.0.113.7";

    #[test]
    fn test_first_request_reports_remaining() {
        let limiter = RequestRateLimiter::default();

        assert_eq!(
            limiter.admit(CLIENT),
            Decision::Allow {
                remaining_minute: 59,
                remaining_hour: 999,
            }
        );
    }

    #[test]
    fn test_sixty_first_request_in_a_minute_is_rejected() {
        let limiter = RequestRateLimiter::default();
        let start = Instant::now();

        for i in 0..60 {
            assert!(
                limiter.admit_at(CLIENT, start).is_allowed(),
                "request {i} should be allowed"
            );
        }

        assert_eq!(
            limiter.admit_at(CLIENT, start + Duration::from_secs(30)),
            Decision::Reject {
                retry_after_seconds: 60
            }
        );
    }

    #[test]
    fn test_minute_window_resets() {
        let limiter = RequestRateLimiter::default();
        let start = Instant::now();

        for _ in 0..60 {
            limiter.admit_at(CLIENT, start);
        }
        assert!(!limiter.admit_at(CLIENT, start).is_allowed());

        assert_eq!(
            limiter.admit_at(CLIENT, start + Duration::from_secs(60)),
            Decision::Allow {
                remaining_minute: 59,
                remaining_hour: 939,
            }
        );
    }

    #[test]
    fn test_hour_ceiling() {
        let limiter = RequestRateLimiter::new(RateLimitConfig {
            max_per_minute: 10,
            max_per_hour: 25,
            ..RateLimitConfig::default()
        });
        let mut now = Instant::now();

        // 10 per minute for three minutes hits the hour ceiling part way through
        let mut allowed = 0;
        for _ in 0..3 {
            for _ in 0..10 {
                if limiter.admit_at(CLIENT, now).is_allowed() {
                    allowed += 1;
                }
            }
            now += Duration::from_secs(60);
        }
        assert_eq!(allowed, 25);

        assert_eq!(
            limiter.admit_at(CLIENT, now),
            Decision::Reject {
                retry_after_seconds: 3600
            }
        );
    }

    #[test]
    fn test_minute_ceiling_checked_before_hour() {
        let limiter = RequestRateLimiter::new(RateLimitConfig {
            max_per_minute: 2,
            max_per_hour: 2,
            ..RateLimitConfig::default()
        });
        let now = Instant::now();

        limiter.admit_at(CLIENT, now);
        limiter.admit_at(CLIENT, now);

        assert_eq!(
            limiter.admit_at(CLIENT, now),
            Decision::Reject {
                retry_after_seconds: 60
            }
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RequestRateLimiter::new(RateLimitConfig {
            max_per_minute: 1,
            ..RateLimitConfig::default()
        });
        let now = Instant::now();

        assert!(limiter.admit_at("198.51.100.1", now).is_allowed());
        assert!(!limiter.admit_at("198.51.100.1", now).is_allowed());
        assert!(limiter.admit_at("198.51.100.2", now).is_allowed());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_concurrent_admissions_never_exceed_ceiling() {
        let limiter = Arc::new(RequestRateLimiter::default());
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..20)
                        .filter(|_| limiter.admit_at(CLIENT, now).is_allowed())
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 60);
    }

    #[test]
    fn test_prune_idle_counters() {
        let limiter = RequestRateLimiter::default();
        let start = Instant::now();

        limiter.admit_at("198.51.100.1", start);
        limiter.admit_at("198.51.100.2", start + Duration::from_secs(3000));

        let removed = limiter.prune_idle_at(start + Duration::from_secs(3600));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
