//! Progress reporting for sync operations.
//!
//! [`SyncProgress`] is a cloneable, thread-safe counter of completed
//! operations out of a precomputed total. The count only ever increases.
//! When enabled it drives an `indicatif` bar; in CI, scripts, or when
//! `MODSYNC_NO_PROGRESS` is set the bar is hidden and only the counter runs.
//!
//! # Examples
//!
//! ```rust
//! use modsync_cli::utils::progress::SyncProgress;
//!
//! let progress = SyncProgress::new(3, false);
//! progress.complete_one("mods/a.jar");
//! assert_eq!(progress.completed(), 1);
//! assert!(!progress.is_complete());
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Environment variable that disables every progress indicator.
pub const NO_PROGRESS_ENV: &str = "MODSYNC_NO_PROGRESS";

/// Whether progress bars are suppressed by the environment.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
        .map(|style| style.progress_chars("━╸━"))
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
}

/// Monotonic completed-operation counter with an optional terminal bar.
#[derive(Clone)]
pub struct SyncProgress {
    completed: Arc<AtomicUsize>,
    total: usize,
    bar: Option<IndicatifBar>,
}

impl SyncProgress {
    /// Create a counter for `total` operations. `with_bar` requests a visible
    /// bar; it is still hidden when [`NO_PROGRESS_ENV`] is set.
    #[must_use]
    pub fn new(total: usize, with_bar: bool) -> Self {
        let bar = (with_bar && !is_progress_disabled()).then(|| {
            let bar = IndicatifBar::new(total as u64);
            bar.set_style(default_style());
            bar.set_prefix("Syncing");
            bar
        });

        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total,
            bar,
        }
    }

    /// Record one finished operation (successful or not). Returns the new count.
    pub fn complete_one(&self, label: &str) -> usize {
        let current = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(bar) = &self.bar {
            bar.set_position(current as u64);
            bar.set_message(label.to_string());
        }
        tracing::trace!(target: "executor", "progress {current}/{}: {label}", self.total);
        current
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed() >= self.total
    }

    /// Clear the bar, leaving a final message on the terminal.
    pub fn finish(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }
}
