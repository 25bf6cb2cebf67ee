//! Fixed-delay retry for operations that can report a transient condition.

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of invocations, the first one included.
    pub max_attempts: NonZeroU32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: NonZeroU32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(DEFAULT_MAX_ATTEMPTS).unwrap_or(NonZeroU32::MIN),
            delay: DEFAULT_DELAY,
        }
    }
}

/// Failure of a single attempt.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Expected to resolve shortly; the operation is invoked again.
    Transient(E),
    /// Terminal; returned to the caller without further attempts.
    Permanent(E),
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("still transient after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("{0}")]
    Permanent(E),
}

/// Run `operation` until it succeeds, fails permanently, or has been invoked
/// `policy.max_attempts` times. Attempts are separated by `policy.delay`.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    operation_name: &'static str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.get();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(Attempt::Permanent(err)) => return Err(RetryError::Permanent(err)),
            Err(Attempt::Transient(err)) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(Attempt::Transient(err)) => {
                warn!(
                    target = "notekeep::retry",
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
