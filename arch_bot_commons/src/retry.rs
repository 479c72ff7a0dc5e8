use std::{future::Future, time::Duration};

use teloxide::RequestError;

/// How hard to try connecting before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total amount of attempts, including the first one.
    pub max_attempts: u32,
    /// Wait after the first failed attempt. Doubles after each next one.
    pub initial_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_wait: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            max_attempts: self.max_attempts,
            attempts_made: 0,
            wait: self.initial_wait,
        }
    }
}

/// Backoff state of a single retry run.
///
/// The wait is not capped; only the attempt count bounds it.
#[derive(Clone, Debug)]
pub struct Backoff {
    max_attempts: u32,
    attempts_made: u32,
    wait: Duration,
}

impl Backoff {
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Wait that will be handed out on the next failure.
    pub fn current_wait(&self) -> Duration {
        self.wait
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }

    /// Register a failed attempt.
    ///
    /// Returns how long to sleep before the next attempt,
    /// or `None` if that was the last one allowed.
    pub fn register_failure(&mut self) -> Option<Duration> {
        self.attempts_made = self.attempts_made.saturating_add(1);
        if self.is_exhausted() {
            return None;
        }
        let wait = self.wait;
        self.wait = self.wait.saturating_mul(2);
        Some(wait)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Network-ish failure, worth trying again.
    Transient,
    /// Protocol or authentication failure. Trying again won't help.
    Fatal,
}

/// Record of one connection attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionAttempt {
    /// 0-based.
    pub index: u32,
    pub outcome: AttemptOutcome,
    /// How long we slept after this attempt, if we did.
    pub wait: Option<Duration>,
}

/// A successfully made connection, plus how we got there.
#[derive(Debug)]
pub struct Connected<T> {
    pub handle: T,
    pub attempts: Vec<ConnectionAttempt>,
}

/// Errors that know whether retrying them makes sense.
pub trait Transience {
    fn is_transient(&self) -> bool;

    /// How long the other side asked us to stay away, if it did.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Transience for RequestError {
    fn is_transient(&self) -> bool {
        // Api errors are Telegram telling us "no", like a revoked token.
        // Retrying those would just get the same answer.
        matches!(
            self,
            RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RequestError::RetryAfter(seconds) => Some(seconds.duration()),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("retry budget is zero, refusing to connect at all")]
    NoAttempts,
    #[error("non-retryable failure on attempt {attempt}: {source}")]
    Fatal {
        /// 0-based index of the failed attempt.
        attempt: u32,
        #[source]
        source: E,
    },
    #[error("gave up after {attempts} attempts, last error: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
}

/// Run `op` until it succeeds, sleeping with exponential backoff
/// between transient failures.
///
/// `op` receives the 0-based index of the attempt. A non-transient error
/// stops everything immediately. No sleep happens after the last attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<Connected<T>, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transience + std::error::Error + 'static,
{
    if policy.max_attempts == 0 {
        log::error!("Asked to connect with zero attempts allowed. Misconfigured?");
        return Err(RetryError::NoAttempts);
    }

    let mut backoff = policy.backoff();
    let mut attempts = Vec::new();

    loop {
        let index = backoff.attempts_made();
        log::debug!("Connection attempt {}/{}", index + 1, policy.max_attempts);

        let error = match op(index).await {
            Ok(handle) => {
                attempts.push(ConnectionAttempt {
                    index,
                    outcome: AttemptOutcome::Success,
                    wait: None,
                });
                log::info!("Connected on attempt {}.", index + 1);
                return Ok(Connected { handle, attempts });
            }
            Err(e) => e,
        };

        if !error.is_transient() {
            log::error!("Attempt {} failed fatally: {error}", index + 1);
            return Err(RetryError::Fatal {
                attempt: index,
                source: error,
            });
        }

        // A flood wait from Telegram can only lengthen ours.
        let wait = backoff
            .register_failure()
            .map(|wait| error.retry_after().map_or(wait, |asked| wait.max(asked)));
        attempts.push(ConnectionAttempt {
            index,
            outcome: AttemptOutcome::Transient,
            wait,
        });

        let Some(wait) = wait else {
            log::error!(
                "Attempt {} failed and that was the last one: {error}",
                index + 1
            );
            return Err(RetryError::Exhausted {
                attempts: backoff.attempts_made(),
                source: error,
            });
        };

        log::warn!(
            "Attempt {}/{} failed: {error}. Retrying in {:?}...",
            index + 1,
            policy.max_attempts,
            wait
        );
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            atomic::{AtomicU32, Ordering},
            Arc,
        },
        time::Duration,
    };

    use teloxide::{
        types::{ChatId, Seconds},
        ApiError, RequestError,
    };
    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("fake error (transient: {0})")]
    struct FakeError(bool);

    impl Transience for FakeError {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_wait: Duration::from_secs(5),
        }
    }

    #[test]
    fn backoff_doubles() {
        let mut backoff = policy(5).backoff();
        assert_eq!(backoff.current_wait(), Duration::from_secs(5));
        assert_eq!(backoff.register_failure(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.register_failure(), Some(Duration::from_secs(10)));
        assert_eq!(backoff.register_failure(), Some(Duration::from_secs(20)));
        assert_eq!(backoff.register_failure(), Some(Duration::from_secs(40)));
        assert!(!backoff.is_exhausted());
        assert_eq!(backoff.register_failure(), None);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.attempts_made(), 5);
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let mut backoff = RetryPolicy {
            max_attempts: u32::MAX,
            initial_wait: Duration::MAX,
        }
        .backoff();
        assert_eq!(backoff.register_failure(), Some(Duration::MAX));
        assert_eq!(backoff.register_failure(), Some(Duration::MAX));
    }

    #[test]
    fn telegram_errors_classify() {
        assert!(!RequestError::Api(ApiError::InvalidToken).is_transient());
        assert!(!RequestError::MigrateToChatId(ChatId(-100)).is_transient());
        assert_eq!(RequestError::Api(ApiError::InvalidToken).retry_after(), None);

        let reset = RequestError::Io(Arc::new(io::Error::other("reset")));
        assert!(reset.is_transient());
        assert_eq!(reset.retry_after(), None);

        let flood = RequestError::RetryAfter(Seconds::from_seconds(90));
        assert!(flood.is_transient());
        assert_eq!(flood.retry_after(), Some(Duration::from_secs(90)));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_as_long_as_flood_control_asks() {
        let start = Instant::now();

        let connected = retry_with_backoff(&policy(5), |_| {
            let elapsed = start.elapsed();
            async move {
                if elapsed < Duration::from_secs(90) {
                    Err(RequestError::RetryAfter(Seconds::from_seconds(90)))
                } else {
                    Ok("handle")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(90));
        let waits = connected
            .attempts
            .iter()
            .map(|x| x.wait.map(|w| w.as_secs()))
            .collect::<Vec<_>>();
        assert_eq!(waits, [Some(90), None]);
    }

    #[tokio::test(start_paused = true)]
    async fn short_flood_wait_keeps_backoff() {
        let start = Instant::now();

        let connected = retry_with_backoff(&policy(5), |index| async move {
            if index < 2 {
                Err(RequestError::RetryAfter(Seconds::from_seconds(1)))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(connected.attempts.len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(5 + 10));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_four_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let connected = retry_with_backoff(&policy(5), |index| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if index < 4 {
                    Err(FakeError(true))
                } else {
                    Ok("handle")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(connected.handle, "handle");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(start.elapsed(), Duration::from_secs(5 + 10 + 20 + 40));

        let waits = connected
            .attempts
            .iter()
            .map(|x| x.wait.map(|w| w.as_secs()))
            .collect::<Vec<_>>();
        assert_eq!(waits, [Some(5), Some(10), Some(20), Some(40), None]);
        assert_eq!(connected.attempts[4].outcome, AttemptOutcome::Success);
        assert_eq!(connected.attempts[4].index, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn first_try_does_not_sleep() {
        let start = Instant::now();
        let connected = retry_with_backoff(&policy(5), |_| async { Ok::<_, FakeError>(()) })
            .await
            .unwrap();
        assert_eq!(connected.attempts.len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_when_exhausted() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_with_backoff(&policy(3), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(FakeError(true)) }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // No sleeping after the last attempt.
        assert_eq!(start.elapsed(), Duration::from_secs(5 + 10));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_immediately() {
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(&policy(5), |index| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(FakeError(index < 2)) }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Fatal { attempt: 2, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_never_calls() {
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(&policy(0), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, FakeError>(()) }
        })
        .await;

        assert!(matches!(result, Err(RetryError::NoAttempts)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
