//! Delete and rename with retry on transient errors.
//!
//! On Windows a file held open by the game (or an antivirus scan) fails with
//! "access denied" or "sharing violation" for a short while. These helpers
//! retry such failures with exponential backoff before giving up.

use crate::utils::backoff::fs_retry_strategy;
use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio_retry::RetryIf;

/// Windows `ERROR_SHARING_VIOLATION`.
const SHARING_VIOLATION: i32 = 32;
/// Windows `ERROR_LOCK_VIOLATION`.
const LOCK_VIOLATION: i32 = 33;

fn is_transient(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::PermissionDenied
        || matches!(error.raw_os_error(), Some(SHARING_VIOLATION | LOCK_VIOLATION))
}

/// Remove a file, treating "already gone" as success.
pub async fn remove_file_with_retry(path: &Path) -> Result<()> {
    let target = path.to_path_buf();
    let result = RetryIf::start(
        fs_retry_strategy(),
        || {
            let target = target.clone();
            async move {
                match tokio::fs::remove_file(&target).await {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    other => other,
                }
            }
        },
        |e: &io::Error| {
            let retry = is_transient(e);
            if retry {
                tracing::debug!(target: "fs::retry", "Delete of {} blocked, will retry: {e}", path.display());
            }
            retry
        },
    )
    .await;

    result.with_context(|| format!("Failed to delete {}", path.display()))
}

/// Rename `from` to `to`, replacing `to` if it exists.
pub async fn rename_with_retry(from: &Path, to: &Path) -> Result<()> {
    let (src, dst): (PathBuf, PathBuf) = (from.to_path_buf(), to.to_path_buf());
    let result = RetryIf::start(
        fs_retry_strategy(),
        || {
            let (src, dst) = (src.clone(), dst.clone());
            async move {
                match tokio::fs::rename(&src, &dst).await {
                    // Windows refuses to rename over an existing file
                    Err(e) if cfg!(windows) && e.kind() == io::ErrorKind::PermissionDenied && dst.exists() => {
                        tokio::fs::remove_file(&dst).await?;
                        tokio::fs::rename(&src, &dst).await
                    }
                    other => other,
                }
            }
        },
        |e: &io::Error| {
            let retry = is_transient(e);
            if retry {
                tracing::debug!(target: "fs::retry", "Rename of {} blocked, will retry: {e}", from.display());
            }
            retry
        },
    )
    .await;

    result.with_context(|| format!("Failed to rename {} to {}", from.display(), to.display()))
}
