use futures::future::BoxFuture;
use std::{fmt, future::Future, time::Duration};
use tokio::time::sleep;
use tracing::warn;

/// Indicates whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Result of running an operation under the retry policy.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was considered fatal and should bubble up immediately.
    Fatal(E),
    /// The error was retryable, but the configured attempts were exhausted.
    AttemptsExceeded { attempts: usize, last: E },
}

impl<E> RetryError<E> {
    /// The error returned by the last attempt.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(err) => err,
            RetryError::AttemptsExceeded { last, .. } => last,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal(err) => write!(f, "{err}"),
            RetryError::AttemptsExceeded { attempts, last } => {
                write!(f, "all {attempts} attempts failed, last error: {last}")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
        }
    }

    /// Same delay between every attempt.
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self::new(max_attempts, delay, delay)
    }

    /// Executes the operation with the configured retry policy.
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        mut op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    attempt = self.on_failure(attempt, err, &classify).await?;
                }
            }
        }
    }

    /// Like [`RetryPolicy::run`], but each attempt borrows `state` mutably.
    ///
    /// Used for operations that need exclusive access to a connection between
    /// attempts.
    pub async fn run_with<S, F, T, E, Classifier>(
        &self,
        state: &mut S,
        mut op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        S: ?Sized,
        F: for<'s> FnMut(&'s mut S) -> BoxFuture<'s, Result<T, E>>,
        E: fmt::Display,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0;

        loop {
            match op(&mut *state).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    attempt = self.on_failure(attempt, err, &classify).await?;
                }
            }
        }
    }

    /// Decides what happens after a failed attempt. Sleeps and returns the
    /// next attempt number, or gives up with the error.
    async fn on_failure<E, Classifier>(
        &self,
        attempt: usize,
        err: E,
        classify: &Classifier,
    ) -> Result<usize, RetryError<E>>
    where
        E: fmt::Display,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        match classify(&err) {
            RetryDisposition::Stop => Err(RetryError::Fatal(err)),
            RetryDisposition::Retry => {
                if attempt + 1 >= self.max_attempts {
                    warn!("All {} attempts failed: {}", self.max_attempts, err);
                    return Err(RetryError::AttemptsExceeded {
                        attempts: self.max_attempts,
                        last: err,
                    });
                }

                let delay = self.backoff_delay(attempt);
                warn!(
                    "Attempt {} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    err,
                    delay
                );
                sleep(delay).await;
                Ok(attempt + 1)
            }
        }
    }

    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::from_millis(0);
        }

        let factor = 1u128 << attempt.min(6);
        let base_ms = self.base_delay.as_millis();
        let delay_ms = base_ms.saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn instant_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(500));
    }

    #[test]
    fn fixed_policy_keeps_delay_constant() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = instant_policy(3)
            .run(
                || {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err("transient")
                        } else {
                            Ok(42)
                        }
                    }
                },
                |_| RetryDisposition::Retry,
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_fatal_error() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = instant_policy(5)
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal") }
                },
                |_| RetryDisposition::Stop,
            )
            .await;

        assert!(matches!(result, Err(RetryError::Fatal("fatal"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reports_exhausted_attempts() {
        let mut attempts_seen = 0usize;

        let result: Result<(), _> = instant_policy(3)
            .run_with(
                &mut attempts_seen,
                |seen| {
                    async move {
                        *seen += 1;
                        Err(format!("failure #{seen}"))
                    }
                    .boxed()
                },
                |_| RetryDisposition::Retry,
            )
            .await;

        assert_eq!(attempts_seen, 3);
        match result {
            Err(RetryError::AttemptsExceeded { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, "failure #3");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
