//! Provider-local retry with exponential backoff and jitter.

use std::time::Duration;

use crate::http_client::{HttpError, HttpResponse};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally jittered by +/- 50%.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(250),
            factor: 2.0,
            max: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = (base.as_secs_f64() * factor.powi(exponent)).min(max.as_secs_f64());
                let delay = Duration::from_secs_f64(seconds.max(0.0));

                if !jitter {
                    return delay;
                }

                let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                let spread = millis / 2;
                let offset = fastrand::u64(0..=spread.saturating_mul(2));
                Duration::from_millis((millis - spread).saturating_add(offset))
            }
        }
    }
}

/// When and how often a provider repeats a failed upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    pub retry_on_status: Vec<u16>,
    pub retry_on_timeout: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
            retry_on_timeout: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self::with_max_retries(0)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn should_retry_error(&self, error: &HttpError) -> bool {
        if error.is_timeout() {
            self.retry_on_timeout
        } else {
            error.retryable()
        }
    }

    /// True when `outcome` of attempt number `attempt` (0-based) deserves another try.
    pub fn should_retry(&self, attempt: u32, outcome: &Result<HttpResponse, HttpError>) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        match outcome {
            Ok(response) => self.should_retry_status(response.status),
            Err(error) => self.should_retry_error(error),
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_millis(500),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_half_of_the_delay() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..20 {
            let delay = backoff.delay(1).as_millis();
            assert!((200..=600).contains(&delay), "delay_ms={delay}");
        }
    }

    #[test]
    fn retries_transient_statuses_until_budget_is_spent() {
        let config = RetryConfig::with_max_retries(2);
        let unavailable = Ok(HttpResponse::new(503, ""));
        let not_found = Ok(HttpResponse::new(404, ""));

        assert!(config.should_retry(0, &unavailable));
        assert!(config.should_retry(1, &unavailable));
        assert!(!config.should_retry(2, &unavailable));
        assert!(!config.should_retry(0, &not_found));
    }

    #[test]
    fn timeouts_follow_the_timeout_flag() {
        let config = RetryConfig {
            retry_on_timeout: false,
            ..RetryConfig::default()
        };

        assert!(!config.should_retry(0, &Err(HttpError::timeout("slow"))));
        assert!(config.should_retry(0, &Err(HttpError::new("reset"))));
        assert!(!config.should_retry(0, &Err(HttpError::non_retryable("bad url"))));
    }

    #[test]
    fn no_retry_never_repeats() {
        let config = RetryConfig::no_retry();
        assert!(!config.should_retry(0, &Ok(HttpResponse::new(500, ""))));
    }
}
