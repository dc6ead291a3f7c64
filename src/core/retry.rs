//! Bounded retry loop used by every persistence primitive.
//!
//! Transient database errors are retried a fixed number of times with a fixed
//! pause. A unique-constraint violation is not transient and stops the loop at
//! once. Exhaustion is reported as `None`, never as an error.

use sea_orm::{DbErr, SqlErr};
use std::future::Future;
use std::time::Duration;

/// How often and how patiently a persistence call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Returns true when retrying `err` cannot help.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// Every failed attempt is logged with `label`. The pause is skipped after
/// the final attempt.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    for attempt in 1..=policy.attempts {
        tracing::debug!("{label}: attempt {attempt}/{}", policy.attempts);
        match op().await {
            Ok(value) => return Some(value),
            Err(err) if is_unique_violation(&err) => {
                tracing::debug!("{label}: row already exists ({err})");
                return None;
            }
            Err(err) => {
                tracing::warn!("{label}: attempt {attempt}/{} failed: {err}", policy.attempts);
                if attempt < policy.attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    tracing::error!("{label}: giving up after {} attempts", policy.attempts);
    None
}
