//! Applying a reconciliation plan.
//!
//! Classes run strictly one after another:
//!
//! 1. disable (rename to the inactive form)
//! 2. enable (rename back to the active form)
//! 3. download
//! 4. update
//! 5. delete
//!
//! Renames never depend on the network, and a delete never races a
//! download of the same path. Within a class, operations run with bounded
//! concurrency in no particular order.
//!
//! Downloads and updates are staged: bytes go to `<path>.part`, are hashed
//! and size-checked, and only then renamed over the target. An update
//! therefore never removes the old file before the new one is verified.
//! A failed attempt (timeout, bad status, digest mismatch) moves on to the
//! next endpoint; a file that fails on every endpoint is reported failed and
//! the rest of the plan still runs.
//!
//! Cancellation is checked before each operation starts. Operations not
//! started are reported as [`OutcomeStatus::Cancelled`]. Every operation is
//! idempotent, so a cancelled run is repaired by the next audit.

pub mod report;

pub use report::{ActionKind, ApplyReport, OperationOutcome, OutcomeStatus};

use crate::constants::{DEFAULT_CONCURRENCY, DOWNLOAD_ATTEMPTS_PER_ENDPOINT, default_attempt_timeout};
use crate::core::{ComponentState, SyncError};
use crate::manifest::FileEntry;
use crate::planner::ReconciliationPlan;
use crate::scanner::hash_file_async;
use crate::transport::{EndpointSet, Transport, join_url};
use crate::tree;
use crate::utils::SyncProgress;
use crate::utils::fs::{join_relative, remove_file_with_retry, rename_with_retry};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub concurrency: usize,
    /// Timeout for one download attempt
    pub attempt_timeout: Duration,
    pub attempts_per_endpoint: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            attempt_timeout: default_attempt_timeout(),
            attempts_per_endpoint: DOWNLOAD_ATTEMPTS_PER_ENDPOINT,
        }
    }
}

/// One unit of work.
#[derive(Debug)]
enum Operation<'a> {
    SetState(&'a str, ComponentState),
    Fetch(&'a FileEntry),
    Delete(&'a str),
}

impl Operation<'_> {
    fn path(&self) -> &str {
        match self {
            Self::SetState(path, _) | Self::Delete(path) => path,
            Self::Fetch(entry) => &entry.path,
        }
    }
}

pub struct DownloadExecutor<T: Transport> {
    transport: T,
    root: PathBuf,
    options: ExecutorOptions,
}

impl<T: Transport> DownloadExecutor<T> {
    pub fn new(transport: T, root: impl Into<PathBuf>, options: ExecutorOptions) -> Self {
        Self {
            transport,
            root: root.into(),
            options,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply `plan` under the executor's root. Never fails as a whole;
    /// per-operation failures are in the report.
    pub async fn apply(
        &self,
        plan: &ReconciliationPlan,
        endpoints: &EndpointSet,
        cancel: &CancellationToken,
        progress: Option<&SyncProgress>,
    ) -> ApplyReport {
        let classes: [(ActionKind, Vec<Operation<'_>>); 5] = [
            (
                ActionKind::Disable,
                plan.to_disable.iter().map(|p| Operation::SetState(p, ComponentState::Inactive)).collect(),
            ),
            (
                ActionKind::Enable,
                plan.to_enable.iter().map(|p| Operation::SetState(p, ComponentState::Active)).collect(),
            ),
            (ActionKind::Download, plan.to_download.iter().map(Operation::Fetch).collect()),
            (ActionKind::Update, plan.to_update.iter().map(Operation::Fetch).collect()),
            (ActionKind::Delete, plan.to_delete.iter().map(|p| Operation::Delete(p)).collect()),
        ];

        let mut report = ApplyReport::default();
        for (action, operations) in classes {
            if operations.is_empty() {
                continue;
            }
            tracing::debug!(target: "executor", "Running {} {action} operations", operations.len());

            let mut outcomes: Vec<OperationOutcome> = stream::iter(operations)
                .map(|operation| self.run(action, operation, endpoints, cancel, progress))
                .buffer_unordered(self.options.concurrency.max(1))
                .collect()
                .await;
            outcomes.sort_by(|a, b| a.path.cmp(&b.path));
            report.extend(outcomes);
        }
        report
    }

    async fn run(
        &self,
        action: ActionKind,
        operation: Operation<'_>,
        endpoints: &EndpointSet,
        cancel: &CancellationToken,
        progress: Option<&SyncProgress>,
    ) -> OperationOutcome {
        let path = operation.path().to_string();
        if cancel.is_cancelled() {
            return OperationOutcome {
                path,
                action,
                status: OutcomeStatus::Cancelled,
                endpoint: None,
            };
        }

        let result = match operation {
            Operation::SetState(logical, state) => tree::set_state(&self.root, logical, state).await.map(|()| None),
            Operation::Fetch(entry) => self.fetch_verified(entry, endpoints).await.map(Some),
            Operation::Delete(raw) => self.delete(raw).await.map(|()| None),
        };

        if let Some(progress) = progress {
            progress.complete_one(&path);
        }

        match result {
            Ok(endpoint) => {
                tracing::info!(target: "executor", "{action} {path}");
                OperationOutcome {
                    path,
                    action,
                    status: OutcomeStatus::Succeeded,
                    endpoint,
                }
            }
            Err(e) => {
                tracing::warn!(target: "executor", "{action} {path} failed: {e:#}");
                OperationOutcome {
                    path,
                    action,
                    status: OutcomeStatus::Failed(format!("{e:#}")),
                    endpoint: None,
                }
            }
        }
    }

    async fn delete(&self, raw: &str) -> Result<()> {
        let target = join_relative(&self.root, raw)?;
        remove_file_with_retry(&target).await
    }

    /// Download `entry`, trying endpoints in order. Returns the endpoint that
    /// delivered verified bytes.
    async fn fetch_verified(&self, entry: &FileEntry, endpoints: &EndpointSet) -> Result<String> {
        let target = join_relative(&self.root, &entry.path)?;
        let staging = tree::staging_path(&target);
        let attempts = self.options.attempts_per_endpoint.max(1);

        let mut last_error: Option<anyhow::Error> = None;
        for (_, endpoint) in endpoints.ordered() {
            let url = join_url(endpoint, entry.locator());
            for attempt in 1..=attempts {
                match self.stage(&url, &staging, entry).await {
                    Ok(()) => {
                        rename_with_retry(&staging, &target).await?;
                        return Ok(endpoint.to_string());
                    }
                    Err(e) => {
                        tracing::debug!(
                            target: "executor",
                            "Attempt {attempt}/{attempts} for {} from {endpoint} failed: {e:#}",
                            entry.path
                        );
                        if let Err(cleanup) = remove_file_with_retry(&staging).await {
                            tracing::warn!(target: "executor", "{cleanup:#}");
                        }
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no endpoints to download {} from", entry.path)))
    }

    /// One attempt: download to the staging path and verify it.
    async fn stage(&self, url: &str, staging: &Path, entry: &FileEntry) -> Result<()> {
        let timeout = self.options.attempt_timeout;
        let written = match tokio::time::timeout(timeout, self.transport.download_to(url, staging)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SyncError::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                }
                .into());
            }
        };
        tracing::trace!(target: "executor", "Staged {written} bytes from {url}");

        let size = tokio::fs::metadata(staging).await?.len();
        let digest = hash_file_async(staging).await?;
        if !entry.matches(&digest, size) {
            return Err(SyncError::IntegrityMismatch {
                path: entry.path.clone(),
                expected: format!("{} ({} bytes)", entry.content_digest, entry.size_bytes),
                actual: format!("{digest} ({size} bytes)"),
            }
            .into());
        }
        Ok(())
    }
}
