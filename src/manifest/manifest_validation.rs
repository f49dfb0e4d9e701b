//! Validation of parsed manifests.
//!
//! A manifest is rejected as a whole rather than partially applied. Checks:
//! - paths are safe relative paths, unique within and across groups
//! - digests are 64 hex characters
//! - only optional entries declare `dependsOn` or `conflictWith`
//! - a published aggregate digest matches the entries
//! - the depends-on graph is acyclic

use super::{FileEntry, Manifest, compute_aggregate_digest};
use crate::constants::{INACTIVE_SUFFIX, STAGING_SUFFIX};
use crate::core::SyncError;
use crate::resolver::ComponentGraph;
use crate::utils::fs::is_safe_relative;
use anyhow::Result;
use std::collections::HashSet;

fn invalid(reason: String) -> anyhow::Error {
    SyncError::ManifestValidation {
        reason,
    }
    .into()
}

impl Manifest {
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();

        for entry in self.entries() {
            validate_entry(entry)?;
            if !seen.insert(entry.path.as_str()) {
                return Err(invalid(format!("path '{}' is declared more than once", entry.path)));
            }
        }

        for entry in &self.required_entries {
            if !entry.depends_on.is_empty() || !entry.conflict_with.is_empty() {
                return Err(invalid(format!(
                    "required entry '{}' declares dependsOn/conflictWith; only optional entries may",
                    entry.path
                )));
            }
        }

        if let Some(published) = self.aggregate_digest.as_deref().filter(|d| !d.is_empty()) {
            let computed = compute_aggregate_digest(&self.required_entries, &self.optional_entries)?;
            if !computed.eq_ignore_ascii_case(published) {
                return Err(invalid(format!(
                    "aggregate digest mismatch: published {published}, computed {computed}"
                )));
            }
        }

        // Rejects cycles with the offending chain
        ComponentGraph::from_manifest(self)?;

        Ok(())
    }
}

fn validate_entry(entry: &FileEntry) -> Result<()> {
    if !is_safe_relative(&entry.path) {
        return Err(invalid(format!("unsafe path '{}'", entry.path)));
    }
    if entry.path.ends_with(INACTIVE_SUFFIX) || entry.path.ends_with(STAGING_SUFFIX) {
        return Err(invalid(format!("path '{}' uses a reserved suffix", entry.path)));
    }
    if entry.content_digest.len() != 64 || !entry.content_digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(format!(
            "entry '{}' has invalid digest '{}'; expected 64 hex characters",
            entry.path, entry.content_digest
        )));
    }
    if entry.depends_on.iter().any(|d| d == &entry.path) {
        return Err(SyncError::CircularDependency {
            chain: format!("{0} -> {0}", entry.path),
        }
        .into());
    }
    Ok(())
}
