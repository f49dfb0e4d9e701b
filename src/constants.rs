//! Global constants used throughout the modsync codebase.
//!
//! This module contains timeout durations, retry parameters, and other
//! numeric constants that are used across multiple modules.

use std::time::Duration;

/// Default number of file operations executed concurrently.
///
/// Work is dominated by network and disk I/O, so the pool is a small constant
/// rather than a function of the CPU count.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Number of manifest fetch attempts made against a single endpoint before
/// falling back to the next one.
pub const MANIFEST_ATTEMPTS_PER_ENDPOINT: usize = 3;

/// Linear backoff step between manifest attempts (1 second).
///
/// The n-th retry against an endpoint waits `n * step`.
pub const MANIFEST_BACKOFF_STEP_MS: u64 = 1000;

/// Default download attempts per endpoint for a single file.
pub const DOWNLOAD_ATTEMPTS_PER_ENDPOINT: usize = 1;

/// Timeout applied to a single network attempt (60 seconds).
pub fn default_attempt_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Suffix appended to an optional component's file while it is inactive.
pub const INACTIVE_SUFFIX: &str = ".disabled";

/// Suffix of the staging file a download is written to before it is verified
/// and swapped into place.
pub const STAGING_SUFFIX: &str = ".part";

/// Read buffer used while streaming files through the digest (1 MiB).
pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// Maximum attempts for a delete or rename that fails with a transient error.
pub const FS_RETRY_ATTEMPTS: usize = 5;

/// Starting delay for filesystem retry backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for filesystem retries (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// How long the side-task queue is given to drain on shutdown (5 seconds).
pub fn side_task_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

/// Default manifest location relative to an endpoint.
pub const DEFAULT_MANIFEST_PATH: &str = "launcher/manifest";

/// Primary endpoint used when no configuration is present.
pub const DEFAULT_PRIMARY_ENDPOINT: &str = "http://148.251.176.5:8000";

/// Fallback endpoint used when the primary is unreachable.
pub const DEFAULT_FALLBACK_ENDPOINT: &str = "http://188.225.24.31:8000";

/// Default prefix for `sourceLocator` values written by the manifest builder.
pub const DEFAULT_LOCATOR_PREFIX: &str = "files/";
