//! Bounded retry with exponential backoff for idempotent cache calls
//!
//! Inserts are never retried here: a timed-out insert may still have
//! committed. Cache `set` and prefix deletion are idempotent and safe to repeat.

use crate::context::RegisterContext;
use crate::errors::RetryError;
use crate::trace_log;
use cache_system::CacheError;
use config::RetryConfig;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    pub fn no_retry() -> Self {
        Self::from(&RetryConfig::no_retry())
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after `failed_attempts` consecutive failures
    pub fn delay_for_attempt(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(failed_attempts.saturating_sub(1) as i32);
        // NaN, infinite or negative products fall back to the cap
        let capped = if base.is_finite() && base >= 0.0 && base < self.max_delay.as_secs_f64() {
            Duration::from_secs_f64(base)
        } else {
            self.max_delay
        };

        if self.jitter {
            capped.saturating_add(capped.mul_f64(0.25 * rand::random::<f64>()))
        } else {
            capped
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts, or the context is cancelled between attempts.
    ///
    /// Each attempt is bounded by `timeout`; an elapsed attempt counts as
    /// [`CacheError::Timeout`], which is retryable.
    pub async fn run<T, F, Fut>(
        &self,
        timeout: Duration,
        ctx: &RegisterContext,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let mut attempts = 0;
        loop {
            if ctx.is_cancelled() {
                return Err(RetryError::Cancelled { attempts });
            }
            attempts += 1;

            let result = match tokio::time::timeout(timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(CacheError::Timeout),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempts < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempts);
                    trace_log!(attempts, ?delay, error = %e, "retrying cache operation");
                    tokio::time::sleep(delay).await;
                }
                Err(source) => return Err(RetryError::Failed { attempts, source }),
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts)
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350))
            .with_jitter(false)
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = policy(5);
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(350));
    }

    #[test]
    fn test_degenerate_multipliers_fall_back_to_max_delay() {
        for multiplier in [f64::NAN, f64::INFINITY, -3.0] {
            let policy = RetryPolicy {
                backoff_multiplier: multiplier,
                ..policy(5)
            };
            assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(350));
            assert!(policy.delay_for_attempt(3) <= Duration::from_millis(350));
        }

        let policy = RetryPolicy {
            max_delay: Duration::MAX,
            backoff_multiplier: f64::NAN,
            ..policy(5).with_jitter(true)
        };
        assert_eq!(policy.delay_for_attempt(2), Duration::MAX);
    }

    #[test]
    fn test_jitter_stays_within_a_quarter() {
        let policy = policy(5).with_jitter(true);
        for _ in 0..50 {
            let delay = policy.delay_for_attempt(2);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = policy(3)
            .run(Duration::from_secs(1), &RegisterContext::new(), || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CacheError::Unavailable("blip".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(3)
            .run(Duration::from_secs(1), &RegisterContext::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CacheError::Unavailable("down".into()))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Failed { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(5)
            .run(Duration::from_secs(1), &RegisterContext::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CacheError::General("bad command".into()))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Failed { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out_and_is_retried() {
        let calls = AtomicU32::new(0);
        let result = policy(2)
            .run(Duration::from_millis(10), &RegisterContext::new(), || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok::<_, CacheError>("done")
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_context_makes_no_attempt() {
        let (ctx, handle) = RegisterContext::cancellable();
        handle.cancel();

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(3)
            .run(Duration::from_secs(1), &ctx, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 0 })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
