//! Poll-until-condition helper
//!
//! External state (the app under test) changes asynchronously after an
//! action; steps observe it by polling until a condition holds rather than
//! assuming immediate consistency. The check distinguishes "satisfied" from
//! "not yet" with an explicit sentinel so a falsy value can still satisfy a
//! condition.

use std::future::Future;
use std::time::Duration;

use crate::common::{Error, Result};

/// Outcome of a single poll evaluation
#[derive(Debug)]
pub enum Check<T> {
    /// The condition is satisfied with this value
    Ready(T),
    /// Not yet; retry after the poll interval. Carries a short reason that
    /// surfaces in the timeout error if the condition never holds.
    Pending(String),
}

/// Convenience constructor for the retry sentinel
pub fn pending<T>(reason: impl Into<String>) -> Check<T> {
    Check::Pending(reason.into())
}

/// Polling configuration for [`wait_for`]
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Delay between evaluations
    pub interval: Duration,
    /// Total time budget before the wait fails
    pub timeout: Duration,
    /// Optional cap on the number of evaluations
    pub max_attempts: Option<u32>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Repeatedly evaluate `check` until it yields [`Check::Ready`].
///
/// The first evaluation happens immediately, so an already-satisfied
/// condition resolves without any delay. A [`Check::Pending`] result sleeps
/// for the poll interval and retries; an error from `check` propagates
/// without further polling. Once the deadline is reached the condition gets
/// one final evaluation, then the wait fails with [`Error::WaitTimeout`];
/// an exhausted `max_attempts` fails the same way.
pub async fn wait_for<T, F, Fut>(options: &WaitOptions, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Check<T>>>,
{
    let started = tokio::time::Instant::now();
    let deadline = started + options.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match check().await? {
            Check::Ready(value) => return Ok(value),
            Check::Pending(reason) => {
                let now = tokio::time::Instant::now();
                let exhausted = options
                    .max_attempts
                    .is_some_and(|max| attempts >= max);
                if exhausted || now >= deadline {
                    return Err(Error::WaitTimeout {
                        waited_ms: started.elapsed().as_millis() as u64,
                        last: reason,
                    });
                }
                // The last sleep is clamped so the final evaluation lands
                // at the deadline, not past it
                tokio::time::sleep(options.interval.min(deadline - now)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let reader = {
            let calls = calls.clone();
            move || calls.load(Ordering::SeqCst)
        };
        (calls, reader)
    }

    #[tokio::test]
    async fn test_satisfied_condition_resolves_on_first_evaluation() {
        let (calls, count) = counted();
        let options = WaitOptions::new()
            .interval(Duration::from_secs(1))
            .timeout(Duration::from_secs(5));

        let started = std::time::Instant::now();
        let value = wait_for(&options, move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Check::Ready(7))
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(count(), 1);
        // No interval sleep should have happened
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_pending_retries_until_ready() {
        let (calls, count) = counted();
        let options = WaitOptions::new()
            .interval(Duration::from_millis(5))
            .timeout(Duration::from_secs(5));

        let value = wait_for(&options, move || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= 3 {
                    Ok(Check::Ready(n))
                } else {
                    Ok(pending("still warming up"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(count(), 3);
    }

    #[tokio::test]
    async fn test_always_pending_times_out_on_schedule() {
        let options = WaitOptions::new()
            .interval(Duration::from_millis(10))
            .timeout(Duration::from_millis(100));

        let started = std::time::Instant::now();
        let result: Result<()> =
            wait_for(&options, || async { Ok(pending("never satisfied")) }).await;
        let elapsed = started.elapsed();

        match result {
            Err(Error::WaitTimeout { last, .. }) => assert_eq!(last, "never satisfied"),
            other => panic!("expected WaitTimeout, got {:?}", other),
        }
        // Not earlier than the timeout, not unbounded
        assert!(elapsed >= Duration::from_millis(95), "failed too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(1), "failed too late: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_check_error_propagates_without_retry() {
        let (calls, count) = counted();
        let options = WaitOptions::new().interval(Duration::from_millis(1));

        let result: Result<()> = wait_for(&options, move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Assertion("broken check".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Assertion(_))));
        assert_eq!(count(), 1);
    }

    #[tokio::test]
    async fn test_max_attempts_bounds_the_poll() {
        let (calls, count) = counted();
        let options = WaitOptions::new()
            .interval(Duration::from_millis(1))
            .timeout(Duration::from_secs(60))
            .max_attempts(3);

        let result: Result<()> = wait_for(&options, move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(pending("not yet"))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::WaitTimeout { .. })));
        assert_eq!(count(), 3);
    }
}
