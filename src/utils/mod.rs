//! Cross-cutting utilities: backoff strategies, file system helpers and
//! progress reporting.

pub mod backoff;
pub mod fs;
pub mod progress;

pub use backoff::{fs_retry_strategy, linear_backoff};
pub use progress::SyncProgress;
