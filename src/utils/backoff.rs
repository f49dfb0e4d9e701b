//! Backoff strategies for retry operations.
//!
//! Both strategies yield delays for use with [`tokio_retry::Retry`]; an
//! iterator of `n` delays allows `n + 1` attempts.

use crate::constants::{FS_RETRY_ATTEMPTS, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Linear backoff: `step`, `2 * step`, `3 * step`, ... for `retries` delays.
///
/// Used between manifest fetch attempts against a single endpoint.
pub fn linear_backoff(step: Duration, retries: usize) -> impl Iterator<Item = Duration> {
    (1..=retries).map(move |n| step.saturating_mul(u32::try_from(n).unwrap_or(u32::MAX)))
}

/// Exponential backoff for transient filesystem errors: 10ms, 20ms, 40ms...
/// capped at 500ms, [`FS_RETRY_ATTEMPTS`] attempts in total.
pub fn fs_retry_strategy() -> impl Iterator<Item = Duration> {
    // base 2 scaled by 5 yields 10ms, 20ms, 40ms, ...
    ExponentialBackoff::from_millis(2)
        .factor(STARTING_BACKOFF_DELAY_MS / 2)
        .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
        .take(FS_RETRY_ATTEMPTS.saturating_sub(1))
}
