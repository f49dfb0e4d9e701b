//! Local tree scanning.
//!
//! [`scan`] walks a managed root and produces a [`LocalState`]: one
//! [`LocalFileRecord`] per regular file, keyed by its on-disk
//! forward-slash relative path. Inactive files keep their suffix in the key,
//! so `mods/a.jar` and `mods/a.jar.disabled` are distinct records and the
//! planner can see both.
//!
//! Symbolic links are not followed. Digests come from the [`HashCache`] when
//! size and modification time still match, otherwise the file is streamed
//! through SHA-256 on the blocking pool with bounded concurrency.
//!
//! Failure policy:
//! - the root missing or not being a directory is fatal
//! - an unreadable entry below the root is logged and left out
//! - a file that fails to hash is logged and left out

pub mod cache;
pub mod hasher;

pub use cache::{CachedDigest, HashCache};
pub use hasher::{hash_bytes, hash_file, hash_file_async};

use crate::constants::DEFAULT_CONCURRENCY;
use crate::core::{ComponentState, SyncError};
use crate::tree;
use crate::utils::fs::to_posix_relative;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

/// One file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileRecord {
    /// On-disk relative path, including any inactive suffix
    pub path: String,
    pub content_digest: String,
    pub size_bytes: u64,
    /// Milliseconds since the Unix epoch
    pub modified_at: i64,
}

impl LocalFileRecord {
    #[must_use]
    pub fn new(path: impl Into<String>, content_digest: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            content_digest: content_digest.into(),
            size_bytes,
            modified_at: 0,
        }
    }

    /// Logical path and state of this record.
    #[must_use]
    pub fn logical(&self) -> (&str, ComponentState) {
        tree::decode(&self.path)
    }
}

/// Snapshot of a managed tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    records: BTreeMap<String, LocalFileRecord>,
}

impl LocalState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = LocalFileRecord>,
    {
        Self {
            records: records.into_iter().map(|r| (r.path.clone(), r)).collect(),
        }
    }

    pub fn insert(&mut self, record: LocalFileRecord) {
        self.records.insert(record.path.clone(), record);
    }

    pub fn remove(&mut self, path: &str) -> Option<LocalFileRecord> {
        self.records.remove(path)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&LocalFileRecord> {
        self.records.get(path)
    }

    /// Records in path order.
    pub fn records(&self) -> impl Iterator<Item = &LocalFileRecord> {
        self.records.values()
    }

    /// Active file for a logical path.
    #[must_use]
    pub fn active(&self, logical: &str) -> Option<&LocalFileRecord> {
        self.records.get(logical)
    }

    /// Inactive file for a logical path.
    #[must_use]
    pub fn inactive(&self, logical: &str) -> Option<&LocalFileRecord> {
        self.records.get(&tree::encode(logical, ComponentState::Inactive))
    }

    /// Path to digest map.
    #[must_use]
    pub fn digests(&self) -> BTreeMap<&str, &str> {
        self.records.iter().map(|(path, r)| (path.as_str(), r.content_digest.as_str())).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A regular file found by the walk, before hashing.
#[derive(Debug)]
struct Candidate {
    relative: String,
    absolute: PathBuf,
    size: u64,
    modified_at: i64,
}

fn millis_since_epoch(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Scan `root` with the default concurrency.
pub async fn scan(root: &Path, cache: &mut HashCache) -> Result<LocalState> {
    scan_with_concurrency(root, cache, DEFAULT_CONCURRENCY).await
}

/// Scan `root`, hashing at most `concurrency` files at once.
///
/// Cache entries for files that have disappeared are pruned.
pub async fn scan_with_concurrency(
    root: &Path,
    cache: &mut HashCache,
    concurrency: usize,
) -> Result<LocalState> {
    let metadata = tokio::fs::metadata(root).await.map_err(|e| SyncError::FileSystemError {
        operation: "scan".to_string(),
        path: root.display().to_string(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(SyncError::FileSystemError {
            operation: "scan".to_string(),
            path: root.display().to_string(),
            reason: "not a directory".to_string(),
        }
        .into());
    }

    let walk_root = root.to_path_buf();
    let candidates = tokio::task::spawn_blocking(move || walk(&walk_root))
        .await
        .context("Directory walk task panicked")??;

    let present: HashSet<String> = candidates.iter().map(|c| c.relative.clone()).collect();

    let mut state = LocalState::new();
    let mut misses = Vec::new();
    for candidate in candidates {
        match cache.lookup(&candidate.relative, candidate.size, candidate.modified_at) {
            Some(digest) => state.insert(LocalFileRecord {
                path: candidate.relative,
                content_digest: digest,
                size_bytes: candidate.size,
                modified_at: candidate.modified_at,
            }),
            None => misses.push(candidate),
        }
    }

    tracing::debug!(
        target: "scanner",
        "{} files cached, {} to hash under {}",
        state.len(),
        misses.len(),
        root.display()
    );

    let hashed: Vec<(Candidate, Result<String>)> = stream::iter(misses)
        .map(|candidate| async move {
            let digest = hash_file_async(&candidate.absolute).await;
            (candidate, digest)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (candidate, digest) in hashed {
        match digest {
            Ok(digest) => {
                cache.insert(candidate.relative.clone(), digest.clone(), candidate.size, candidate.modified_at);
                state.insert(LocalFileRecord {
                    path: candidate.relative,
                    content_digest: digest,
                    size_bytes: candidate.size,
                    modified_at: candidate.modified_at,
                });
            }
            Err(e) => {
                tracing::warn!(target: "scanner", "Skipping {}: {e:#}", candidate.relative);
            }
        }
    }

    cache.retain_paths(&present);
    Ok(state)
}

fn walk(root: &Path) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(SyncError::FileSystemError {
                    operation: "scan".to_string(),
                    path: root.display().to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
            Err(e) => {
                tracing::warn!(target: "scanner", "Skipping unreadable entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative) = to_posix_relative(root, entry.path()) else {
            tracing::warn!(target: "scanner", "Skipping non-UTF-8 path {}", entry.path().display());
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(target: "scanner", "Skipping {relative}: {e}");
                continue;
            }
        };

        candidates.push(Candidate {
            relative,
            absolute: entry.path().to_path_buf(),
            size: metadata.len(),
            modified_at: metadata.modified().map(millis_since_epoch).unwrap_or(0),
        });
    }

    Ok(candidates)
}
