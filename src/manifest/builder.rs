//! Building a manifest from directories on the server side.
//!
//! The required tree and the optional tree are scanned with the same hasher
//! the client uses, so a freshly built manifest audits as converged against
//! a copy of those trees. Every entry's `sourceLocator` is
//! `<locator_prefix><path>`.
//!
//! `dependsOn` and `conflictWith` cannot be derived from files. They can be
//! carried over from a previous manifest with [`ManifestBuilder::relations_from`].

use super::{FileEntry, Manifest};
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_LOCATOR_PREFIX, INACTIVE_SUFFIX, STAGING_SUFFIX};
use crate::scanner::{self, HashCache};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    format_version: String,
    required_dir: Option<PathBuf>,
    optional_dir: Option<PathBuf>,
    locator_prefix: String,
    concurrency: usize,
    relations: HashMap<String, (Vec<String>, Vec<String>)>,
}

impl ManifestBuilder {
    pub fn new(format_version: impl Into<String>) -> Self {
        Self {
            format_version: format_version.into(),
            required_dir: None,
            optional_dir: None,
            locator_prefix: DEFAULT_LOCATOR_PREFIX.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            relations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn required_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.required_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn optional_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.optional_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn locator_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.locator_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Keep the `dependsOn`/`conflictWith` declared in `previous` for optional
    /// entries whose path still exists.
    #[must_use]
    pub fn relations_from(mut self, previous: &Manifest) -> Self {
        for entry in &previous.optional_entries {
            if !entry.depends_on.is_empty() || !entry.conflict_with.is_empty() {
                self.relations
                    .insert(entry.path.clone(), (entry.depends_on.clone(), entry.conflict_with.clone()));
            }
        }
        self
    }

    pub async fn build(self) -> Result<Manifest> {
        let required = match &self.required_dir {
            Some(dir) => self.collect(dir).await?,
            None => Vec::new(),
        };

        let mut optional = match &self.optional_dir {
            Some(dir) => self.collect(dir).await?,
            None => Vec::new(),
        };
        for entry in &mut optional {
            if let Some((depends_on, conflict_with)) = self.relations.get(&entry.path) {
                entry.depends_on.clone_from(depends_on);
                entry.conflict_with.clone_from(conflict_with);
            }
        }

        tracing::info!(
            "Built manifest {} with {} required and {} optional entries",
            self.format_version,
            required.len(),
            optional.len()
        );

        Manifest::new(self.format_version, required, optional)
    }

    async fn collect(&self, dir: &Path) -> Result<Vec<FileEntry>> {
        let mut cache = HashCache::new(dir);
        let state = scanner::scan_with_concurrency(dir, &mut cache, self.concurrency)
            .await
            .with_context(|| format!("Failed to scan {}", dir.display()))?;

        let mut entries = Vec::with_capacity(state.len());
        for record in state.records() {
            if record.path.ends_with(INACTIVE_SUFFIX) || record.path.ends_with(STAGING_SUFFIX) {
                tracing::warn!("Leaving {} out of the manifest: reserved suffix", record.path);
                continue;
            }
            entries.push(
                FileEntry::new(&record.path, &record.content_digest, record.size_bytes)
                    .with_locator(format!("{}{}", self.locator_prefix, record.path)),
            );
        }
        Ok(entries)
    }
}
