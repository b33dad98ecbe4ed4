use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::{BackoffPolicy, ProviderPolicy};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Non-blocking rate budget. A rejected call gets a suggested wait back instead
/// of sleeping, so the provider chain can move on immediately.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<DirectRateLimiter>,
    consecutive_rejections: Arc<AtomicU32>,
    retry_backoff: BackoffPolicy,
}

impl Throttle {
    pub fn new(quota_window: Duration, quota_limit: u32, retry_backoff: BackoffPolicy) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                quota_limit,
            ))),
            consecutive_rejections: Arc::new(AtomicU32::new(0)),
            retry_backoff,
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(
            policy.quota_window,
            policy.quota_limit,
            policy.retry_backoff.clone(),
        )
    }

    /// Takes one unit of budget, or returns how long to wait before asking again.
    pub fn acquire(&self) -> Result<(), Duration> {
        if self.limiter.check().is_ok() {
            self.consecutive_rejections.store(0, Ordering::Relaxed);
            return Ok(());
        }

        let rejections = self.consecutive_rejections.fetch_add(1, Ordering::Relaxed);
        Err(self.retry_delay(rejections))
    }

    pub fn retry_delay(&self, rejections: u32) -> Duration {
        let exponent = i32::try_from(rejections).unwrap_or(i32::MAX);
        let scale = self.retry_backoff.multiplier.powi(exponent);
        let seconds = self.retry_backoff.initial_delay.as_secs_f64() * scale;
        Duration::from_secs_f64(seconds.min(self.retry_backoff.max_delay.as_secs_f64()))
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }

    #[test]
    fn rejects_once_burst_is_spent() {
        let throttle = Throttle::new(Duration::from_secs(60), 2, backoff());

        assert!(throttle.acquire().is_ok());
        assert!(throttle.acquire().is_ok());
        assert_eq!(throttle.acquire(), Err(Duration::from_secs(2)));
        assert_eq!(throttle.acquire(), Err(Duration::from_secs(4)));
    }

    #[test]
    fn suggested_wait_is_capped() {
        let throttle = Throttle::new(Duration::from_secs(60), 1, backoff());

        assert_eq!(throttle.retry_delay(0), Duration::from_secs(2));
        assert_eq!(throttle.retry_delay(2), Duration::from_secs(8));
        assert_eq!(throttle.retry_delay(5), Duration::from_secs(10));
    }
}
