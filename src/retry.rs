//! Bounded retry with a fixed delay between attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Retry a fallible async operation up to `policy.max_attempts` times.
///
/// The closure receives the 1-based attempt number. Sleeps `policy.delay`
/// between attempts but not after the last one. Returns the first `Ok`, or
/// the error of the final attempt.
pub async fn retry_with_delay<T, E, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    mut attempt_fn: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match attempt_fn(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts => {
                warn!("{label}: attempt {attempt}/{max_attempts} failed: {e}");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!("{label}: attempt {attempt}/{max_attempts} failed, giving up: {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts_with_delays_between() {
        let calls = Cell::new(0u32);
        let started = Instant::now();

        let result: Result<(), String> = retry_with_delay(
            "test",
            RetryPolicy::new(3, Duration::from_secs(5)),
            |_| {
                calls.set(calls.get() + 1);
                async { Err("unreachable".to_string()) }
            },
        )
        .await;

        assert_eq!(result, Err("unreachable".to_string()));
        assert_eq!(calls.get(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let result: Result<u32, String> = retry_with_delay(
            "test",
            RetryPolicy::new(3, Duration::from_secs(5)),
            |attempt| async move {
                if attempt < 2 {
                    Err("flaky".to_string())
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(result, Ok(2));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
