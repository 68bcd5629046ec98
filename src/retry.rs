//! Retry classification and linear backoff
//!
//! A failed attempt is never retried in place. The executor records the
//! failure, asks [`next_retry_delay`] whether budget remains, and puts the
//! task back on the dispatch queue once the delay has elapsed.
//!
//! # Example
//!
//! ```
//! use remote_dl::config::RetryConfig;
//! use remote_dl::retry::next_retry_delay;
//! use std::time::Duration;
//!
//! let config = RetryConfig {
//!     max_attempts: 3,
//!     base_delay: Duration::from_secs(2),
//!     jitter: false,
//! };
//! assert_eq!(next_retry_delay(&config, 1), Some(Duration::from_secs(2)));
//! assert_eq!(next_retry_delay(&config, 2), Some(Duration::from_secs(4)));
//! assert_eq!(next_retry_delay(&config, 3), None);
//! ```

use crate::config::RetryConfig;
use crate::error::TransferError;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network errors, bad status, premature disconnect) return `true`.
/// Permanent failures (disk full, unbuildable request) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransferError {
    fn is_retryable(&self) -> bool {
        match self {
            // Every unexpected status counts, 4xx included
            TransferError::Http { .. } => true,
            TransferError::Network(_) => true,
            TransferError::PrematureEof { .. } => true,
            TransferError::File { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            TransferError::InvalidRequest(_) => false,
        }
    }
}

/// Delay before the next attempt, or `None` once `retry_count` has used the budget.
///
/// `retry_count` is the number of failed attempts so far, including the one
/// that just failed. Attempt `n` waits `base_delay * n`.
pub fn next_retry_delay(config: &RetryConfig, retry_count: u32) -> Option<Duration> {
    if retry_count >= config.max_attempts {
        return None;
    }
    let delay = config.base_delay.saturating_mul(retry_count.max(1));
    Some(if config.jitter {
        add_jitter(delay)
    } else {
        delay
    })
}

/// Add up to 50% random jitter to a delay
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=0.5);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
