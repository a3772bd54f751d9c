//! Fixed-interval call spacing with jittered exponential backoff.

use std::cell::Cell;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::error::VisionError;
use crate::models::config::ThrottleConfig;

const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(250);

/// Spaces calls and retries failures.
///
/// Not a token bucket: every attempt simply waits until `min_call_interval`
/// has passed since the previous attempt. The last-attempt instant is plain
/// interior state; the throttle is meant for one sequential caller.
#[derive(Debug)]
pub struct Throttle {
    min_call_interval: Duration,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    max_jitter: Duration,
    last_call: Cell<Option<Instant>>,
}

impl Throttle {
    pub fn new(
        min_call_interval: Duration,
        max_retries: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            min_call_interval,
            max_retries,
            initial_backoff,
            max_backoff,
            max_jitter: DEFAULT_MAX_JITTER,
            last_call: Cell::new(None),
        }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(
            config.min_call_interval(),
            config.max_retries,
            config.initial_backoff(),
            config.max_backoff(),
        )
        .with_max_jitter(config.max_jitter())
    }

    /// Set the upper bound of the random delay added to each wait.
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Run `op` with spacing and retries.
    ///
    /// Rate-limit failures wait for the server hint (or the current backoff)
    /// and never end the loop early. Other failures give up once
    /// `max_retries` attempts were made. Giving up yields `None`.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VisionError>>,
    {
        let mut backoff = self.initial_backoff;

        for attempt in 1..=self.max_retries {
            self.pause().await;

            match op().await {
                Ok(value) => return Some(value),
                Err(err) if err.is_rate_limit() => {
                    let wait = err.retry_after().filter(|d| !d.is_zero()).unwrap_or(backoff);
                    debug!("Rate limited (attempt {}/{}), waiting {:?}", attempt, self.max_retries, wait);
                    sleep(wait.saturating_add(self.jitter())).await;
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        warn!("Vision call failed after {} attempts: {}", attempt, err);
                        return None;
                    }
                    debug!("Vision call failed (attempt {}/{}): {}", attempt, self.max_retries, err);
                    sleep(backoff.saturating_add(self.jitter())).await;
                }
            }

            backoff = next_backoff(backoff, self.max_backoff);
        }

        warn!("Vision call still rate limited after {} attempts", self.max_retries);
        None
    }

    async fn pause(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = last.elapsed();
            if elapsed < self.min_call_interval {
                sleep(self.min_call_interval - elapsed).await;
            }
        }
        self.last_call.set(Some(Instant::now()));
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let secs = rand::rng().random_range(0.0..=self.max_jitter.as_secs_f64());
        Duration::try_from_secs_f64(secs).map_or(self.max_jitter, |d| d.min(self.max_jitter))
    }
}

/// Double `backoff`, capped at `max`.
fn next_backoff(backoff: Duration, max: Duration) -> Duration {
    backoff.saturating_mul(2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle(min_interval_ms: u64, max_retries: u32) -> Throttle {
        Throttle::new(
            Duration::from_millis(min_interval_ms),
            max_retries,
            Duration::from_millis(600),
            Duration::from_secs(5),
        )
        .with_max_jitter(Duration::ZERO)
    }

    fn api_error() -> VisionError {
        VisionError::Api {
            status: 500,
            body: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_interval_between_calls() {
        let throttle = throttle(350, 3);
        let start = Instant::now();

        assert_eq!(throttle.call(|| async { Ok::<_, VisionError>(1) }).await, Some(1));
        assert!(start.elapsed() < Duration::from_millis(10));

        assert_eq!(throttle.call(|| async { Ok::<_, VisionError>(2) }).await, Some(2));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(350) && elapsed < Duration::from_millis(400), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_when_interval_already_passed() {
        let throttle = throttle(350, 3);
        throttle.call(|| async { Ok::<_, VisionError>(()) }).await;
        sleep(Duration::from_secs(1)).await;

        let start = Instant::now();
        throttle.call(|| async { Ok::<_, VisionError>(()) }).await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_until_success() {
        let throttle = throttle(0, 6);
        let attempts = Cell::new(0);
        let start = Instant::now();

        let result = throttle
            .call(|| {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move { if n < 4 { Err(api_error()) } else { Ok(n) } }
            })
            .await;

        assert_eq!(result, Some(4));
        // 0.6 + 1.2 + 2.4
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(4200) && elapsed < Duration::from_millis(4300), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let throttle = Throttle::new(Duration::ZERO, 6, Duration::from_secs(3), Duration::from_secs(5))
            .with_max_jitter(Duration::ZERO);
        let attempts = Cell::new(0);
        let start = Instant::now();

        throttle
            .call(|| {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move { if n < 4 { Err(api_error()) } else { Ok(()) } }
            })
            .await;

        // 3 + 5 + 5
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(13) && elapsed < Duration::from_millis(13100), "{elapsed:?}");
    }

    #[test]
    fn test_next_backoff_saturates() {
        assert_eq!(next_backoff(Duration::from_millis(600), Duration::from_secs(5)), Duration::from_millis(1200));
        assert_eq!(next_backoff(Duration::from_secs(4), Duration::from_secs(5)), Duration::from_secs(5));
        assert_eq!(next_backoff(Duration::MAX / 2 + Duration::from_secs(1), Duration::MAX), Duration::MAX);
        assert_eq!(next_backoff(Duration::MAX, Duration::MAX), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let throttle = throttle(0, 3);
        let attempts = Cell::new(0);

        let result: Option<()> = throttle
            .call(|| {
                attempts.set(attempts.get() + 1);
                async { Err(api_error()) }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_uses_hint() {
        let throttle = throttle(350, 6);
        let attempts = Cell::new(0);
        let start = Instant::now();

        let result = throttle
            .call(|| {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move {
                    if n == 1 {
                        Err(VisionError::RateLimited {
                            retry_after: Some(Duration::from_secs(2)),
                        })
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result, Some("ok"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_hint_uses_backoff() {
        let throttle = throttle(0, 6);
        let attempts = Cell::new(0);
        let start = Instant::now();

        throttle
            .call(|| {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move {
                    if n < 3 {
                        Err(VisionError::RateLimited { retry_after: None })
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        // 0.6 + 1.2
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1800) && elapsed < Duration::from_millis(1900), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhaustion_yields_none() {
        let throttle = throttle(0, 2);
        let attempts = Cell::new(0);

        let result: Option<()> = throttle
            .call(|| {
                attempts.set(attempts.get() + 1);
                async { Err(VisionError::RateLimited { retry_after: None }) }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(attempts.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_is_bounded() {
        let throttle = Throttle::new(Duration::ZERO, 2, Duration::from_millis(600), Duration::from_secs(5));
        let attempts = Cell::new(0);
        let start = Instant::now();

        throttle
            .call(|| {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move { if n == 1 { Err(api_error()) } else { Ok(()) } }
            })
            .await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(600) && elapsed <= Duration::from_millis(860), "{elapsed:?}");
    }
}
