//! Test utilities for modsync
//!
//! Helpers shared by unit and integration tests:
//! - [`MockTransport`], a scripted transport that records requests
//! - [`MirrorFixture`], a `file://` mirror with a published manifest
//! - small helpers for writing and listing game trees
//!
//! # Example
//!
//! ```rust,no_run
//! use modsync_cli::test_utils::MirrorFixture;
//!
//! let mut mirror = MirrorFixture::new().unwrap();
//! mirror.required("core/engine.jar", b"engine").unwrap();
//! mirror.publish("1").unwrap();
//! let endpoint = mirror.endpoint();
//! ```

pub mod fixtures;
pub mod transport;

pub use fixtures::{MirrorFixture, entry, file_url, list_files, write_file};
pub use transport::{MockResponse, MockTransport};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; with
/// neither, tests run silent.
///
/// ```bash
/// RUST_LOG=executor=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true) // Show targets like "executor"
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
