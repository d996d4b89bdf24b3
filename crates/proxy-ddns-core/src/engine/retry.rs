//! Retry wrapper shared by every provider call
//!
//! Providers are single-shot; the reconciler owns the retry policy. The
//! wrapper distinguishes "the provider didn't answer" (an `Err` from the
//! provider, retried) from "the provider answered" (any `ProviderResponse`,
//! returned as-is even when its success flag is false).

use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::RetryConfig;
use crate::error::Result;
use crate::traits::ProviderResponse;

/// Fixed-count, fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Delay between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; at least one attempt is always made
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `attempt` until the provider answers or attempts run out
    ///
    /// # Returns
    ///
    /// - `Some(ProviderResponse)`: the first answer that arrived, whatever
    ///   its success flag
    /// - `None`: every attempt failed at the transport level (the failure
    ///   sentinel)
    pub async fn call<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Option<ProviderResponse<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ProviderResponse<T>>>,
    {
        for attempt_no in 1..=self.max_attempts {
            match attempt().await {
                Ok(response) => return Some(response),
                Err(e) => {
                    debug!(
                        "Request failed for {}. Attempt {}/{}. Error: {}",
                        operation, attempt_no, self.max_attempts, e
                    );

                    // Wait before retry (unless this was the last attempt)
                    if attempt_no < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        error!(
            "Failed to perform {} after {} attempts",
            operation, self.max_attempts
        );
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn transport_errors_exhaust_attempts() {
        let policy = RetryPolicy::default();
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        let response: Option<ProviderResponse<()>> = policy
            .call("test call", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::http("connection refused"))
            })
            .await;

        assert!(response.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two waits between three attempts, none after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_returned_without_retry() {
        let policy = RetryPolicy::default();
        let calls = AtomicUsize::new(0);

        let response: Option<ProviderResponse<()>> = policy
            .call("test call", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(ProviderResponse::rejected(vec!["1004: invalid".to_string()]))
            })
            .await;

        let response = response.expect("an answer arrived");
        assert!(!response.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let policy = RetryPolicy::default();
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        let response = policy
            .call("test call", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::http("timeout"))
                } else {
                    Ok(ProviderResponse::ok(42))
                }
            })
            .await;

        assert_eq!(response.and_then(|r| r.result), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn builds_from_config() {
        let policy = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(policy, RetryPolicy::new(3, Duration::from_secs(5)));
    }
}
