//! Persistent digest cache.
//!
//! Maps a root-relative path to the digest computed for it together with the
//! size and modification time observed at that moment. A lookup only hits
//! when both still match; a mismatching entry is dropped on the spot. The
//! cache is stored outside the managed tree as JSON:
//!
//! ```json
//! { "root": "/games/pack", "entries": { "mods/a.jar": { "digest": "…", "size": 10, "modifiedAt": 1700000000000 } } }
//! ```
//!
//! Losing or corrupting the file only costs a full rehash, so load never fails.

use crate::utils::fs::atomic_write_async;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDigest {
    pub digest: String,
    pub size: u64,
    /// Milliseconds since the Unix epoch
    pub modified_at: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    root: String,
    entries: BTreeMap<String, CachedDigest>,
}

/// In-memory digest cache for one managed root.
#[derive(Debug, Default)]
pub struct HashCache {
    root: String,
    entries: BTreeMap<String, CachedDigest>,
    dirty: bool,
}

fn root_key(root: &Path) -> String {
    root.to_string_lossy().replace('\\', "/")
}

impl HashCache {
    /// An empty cache for `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root_key(root),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Load the cache stored at `path` for `root`.
    ///
    /// A missing or unreadable file, or one written for a different root,
    /// yields an empty cache.
    pub async fn load(path: &Path, root: &Path) -> Self {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::new(root),
            Err(e) => {
                tracing::warn!("Ignoring unreadable hash cache {}: {e}", path.display());
                return Self::new(root);
            }
        };

        match serde_json::from_slice::<CacheFile>(&bytes) {
            Ok(file) if file.root == root_key(root) => {
                tracing::debug!("Loaded {} cached digests from {}", file.entries.len(), path.display());
                Self {
                    root: file.root,
                    entries: file.entries,
                    dirty: false,
                }
            }
            Ok(file) => {
                tracing::debug!("Hash cache {} belongs to {}; starting fresh", path.display(), file.root);
                Self::new(root)
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt hash cache {}: {e}", path.display());
                Self::new(root)
            }
        }
    }

    /// Read a cache file as stored, whatever root it belongs to.
    ///
    /// Unlike [`HashCache::load`] a corrupt file is an error. `None` when the
    /// file does not exist.
    pub async fn read(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read hash cache {}", path.display()));
            }
        };
        let file: CacheFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("Hash cache {} is corrupt", path.display()))?;
        Ok(Some(Self {
            root: file.root,
            entries: file.entries,
            dirty: false,
        }))
    }

    /// Write the cache to `path` atomically.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let file = CacheFile {
            root: self.root.clone(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec(&file).context("Failed to serialize hash cache")?;
        atomic_write_async(path, json)
            .await
            .with_context(|| format!("Failed to save hash cache to {}", path.display()))
    }

    /// Cached digest for `path` if size and modification time still match.
    /// A stale entry is removed.
    pub fn lookup(&mut self, path: &str, size: u64, modified_at: i64) -> Option<String> {
        let cached = self.entries.get(path)?;
        if cached.size == size && cached.modified_at == modified_at {
            return Some(cached.digest.clone());
        }
        self.entries.remove(path);
        self.dirty = true;
        None
    }

    pub fn insert(&mut self, path: impl Into<String>, digest: impl Into<String>, size: u64, modified_at: i64) {
        self.entries.insert(
            path.into(),
            CachedDigest {
                digest: digest.into(),
                size,
                modified_at,
            },
        );
        self.dirty = true;
    }

    /// Drop entries for paths that no longer exist.
    pub fn retain_paths(&mut self, present: &HashSet<String>) {
        let before = self.entries.len();
        self.entries.retain(|path, _| present.contains(path));
        if self.entries.len() != before {
            self.dirty = true;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty = true;
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&CachedDigest> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the cache changed since it was loaded.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }
}
