//! Retry and backoff logic for redis-mcp store connections
//!
//! Store clients open their connections through [`with_backoff`], which
//! retries transient failures on an exponential schedule and gives up
//! immediately on permanent ones.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Failure of a retried operation, carrying the last underlying error
#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("operation '{operation}' failed after {attempts} attempts: {source}")]
    Exhausted {
        operation: &'static str,
        attempts: usize,
        source: E,
    },
    #[error("operation '{operation}' failed permanently: {source}")]
    Permanent { operation: &'static str, source: E },
}

impl<E> RetryError<E> {
    /// Unwrap the last underlying error
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::Permanent { source, .. } => source,
        }
    }

    /// Number of attempts made before the operation was abandoned
    pub fn attempts(&self) -> Option<usize> {
        match self {
            RetryError::Exhausted { attempts, .. } => Some(*attempts),
            RetryError::Permanent { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = std::result::Result<T, RetryError<E>>;

/// Trait for categorizing errors as transient or permanent
pub trait RetryableError {
    /// Returns true if the error is transient and the operation should be retried
    fn is_transient(&self) -> bool;

    /// Returns true if the error is permanent and retries should stop
    fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Execute an operation with the connection backoff policy
pub async fn with_backoff<F, Fut, T, E>(
    op_name: &'static str,
    max_attempts: usize,
    f: F,
) -> RetryResult<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    with_custom_backoff(op_name, connection_backoff_policy(), max_attempts, f).await
}

/// Execute an operation with a custom backoff policy
///
/// The closure receives the 1-based attempt number. Retries stop when the
/// error is permanent, when `max_attempts` is reached, or when the policy's
/// elapsed-time budget runs out.
pub async fn with_custom_backoff<F, Fut, T, E>(
    op_name: &'static str,
    mut policy: ExponentialBackoff,
    max_attempts: usize,
    mut f: F,
) -> RetryResult<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    policy.reset();
    let mut attempt = 1;

    loop {
        debug!(operation = op_name, attempt, "attempting operation");

        match f(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = op_name,
                        attempts = attempt,
                        "operation succeeded after retrying"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_permanent() => {
                warn!(operation = op_name, attempt, error = %err, "operation failed permanently");
                return Err(RetryError::Permanent {
                    operation: op_name,
                    source: err,
                });
            }
            Err(err) => {
                warn!(operation = op_name, attempt, error = %err, "operation failed");

                let delay = match policy.next_backoff() {
                    Some(delay) if attempt < max_attempts => delay,
                    _ => {
                        return Err(RetryError::Exhausted {
                            operation: op_name,
                            attempts: attempt,
                            source: err,
                        })
                    }
                };

                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Backoff policy for opening store connections
///
/// Starts at 50ms and caps individual waits at one second.
pub fn connection_backoff_policy() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(50))
        .with_max_interval(Duration::from_secs(1))
        .with_max_elapsed_time(Some(Duration::from_secs(30)))
        .with_multiplier(2.0)
        .build()
}
