//! Manifest data model.
//!
//! The manifest is the server's declaration of the complete target file set.
//! It is published as JSON at `<endpoint>/<manifest-path>`:
//!
//! ```json
//! {
//!   "formatVersion": "2024.11.3",
//!   "generatedAt": "2024-11-03T10:00:00Z",
//!   "aggregateDigest": "5f1c...",
//!   "requiredEntries": [
//!     { "path": "mods/core-1.2.jar", "contentDigest": "ab12...", "sizeBytes": 1024,
//!       "sourceLocator": "files/mods/core-1.2.jar" }
//!   ],
//!   "optionalEntries": [
//!     { "path": "mods/addon.jar", "contentDigest": "cd34...", "sizeBytes": 2048,
//!       "dependsOn": ["mods/core-1.2.jar"], "conflictWith": ["mods/other.jar"] }
//!   ]
//! }
//! ```
//!
//! Older servers publish `required`/`optional` lists with `sha256`, `size`
//! and `url` fields and a `dirHash`; those names are accepted as aliases.
//!
//! A [`Manifest`] is immutable once parsed. Fetching again produces a new
//! value. Parsing always validates (see [`Manifest::validate`]), so a
//! manifest that exists in memory is known to be consistent.

pub mod builder;
pub mod digest;
pub mod fetch;
mod manifest_validation;

pub use builder::ManifestBuilder;
pub use digest::compute_aggregate_digest;
pub use fetch::{FetchedManifest, ManifestClient, ManifestFetchOptions};

use crate::core::{Group, SyncError};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One manifest-declared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// POSIX-relative, case-preserved path; the component id for optional entries
    pub path: String,

    /// Lowercase hex SHA-256 of the file content
    #[serde(alias = "sha256", alias = "hash")]
    pub content_digest: String,

    #[serde(alias = "size")]
    pub size_bytes: u64,

    /// Derived from the list the entry is declared in
    #[serde(skip)]
    pub required: bool,

    /// Where to fetch the file, relative to an endpoint. Defaults to `path`.
    #[serde(default, alias = "url", skip_serializing_if = "Option::is_none")]
    pub source_locator: Option<String>,

    /// Paths of entries that must be active for this one to be active
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Paths of entries that may never be active together with this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflict_with: Vec<String>,
}

impl FileEntry {
    #[must_use]
    pub fn new(path: impl Into<String>, content_digest: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            content_digest: content_digest.into(),
            size_bytes,
            required: false,
            source_locator: None,
            depends_on: Vec::new(),
            conflict_with: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.source_locator = Some(locator.into());
        self
    }

    #[must_use]
    pub fn with_depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_conflicts<I, S>(mut self, conflicts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflict_with = conflicts.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn group(&self) -> Group {
        if self.required {
            Group::Required
        } else {
            Group::Optional
        }
    }

    /// Locator relative to an endpoint.
    #[must_use]
    pub fn locator(&self) -> &str {
        self.source_locator.as_deref().unwrap_or(&self.path)
    }

    /// Whether a local file with this digest and size is this entry's content.
    #[must_use]
    pub fn matches(&self, content_digest: &str, size_bytes: u64) -> bool {
        self.size_bytes == size_bytes && self.content_digest.eq_ignore_ascii_case(content_digest)
    }
}

/// The server-declared target state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Opaque string compared for "has anything changed"
    #[serde(default, alias = "version")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "required")]
    pub required_entries: Vec<FileEntry>,

    #[serde(default, alias = "optional")]
    pub optional_entries: Vec<FileEntry>,

    /// Digest over every entry, tagged by group
    #[serde(default, alias = "dirHash", skip_serializing_if = "Option::is_none")]
    pub aggregate_digest: Option<String>,
}

impl Manifest {
    /// Assemble a manifest from its two groups, computing the aggregate digest.
    pub fn new(
        format_version: impl Into<String>,
        required: Vec<FileEntry>,
        optional: Vec<FileEntry>,
    ) -> Result<Self> {
        let mut manifest = Self {
            format_version: format_version.into(),
            generated_at: Some(Utc::now()),
            required_entries: required,
            optional_entries: optional,
            aggregate_digest: None,
        };
        manifest.normalize();
        manifest.aggregate_digest =
            Some(compute_aggregate_digest(&manifest.required_entries, &manifest.optional_entries)?);
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse and validate manifest JSON. `source_name` is used in errors.
    pub fn from_json(bytes: &[u8], source_name: &str) -> Result<Self> {
        let mut manifest: Self =
            serde_json::from_slice(bytes).map_err(|e| SyncError::ManifestParseError {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;
        manifest.normalize();
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn normalize(&mut self) {
        for entry in &mut self.required_entries {
            entry.required = true;
        }
        for entry in &mut self.optional_entries {
            entry.required = false;
        }
        self.required_entries.sort_by(|a, b| a.path.cmp(&b.path));
        self.optional_entries.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Every entry, required first.
    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.required_entries.iter().chain(self.optional_entries.iter())
    }

    #[must_use]
    pub fn entry(&self, path: &str) -> Option<&FileEntry> {
        self.entries().find(|e| e.path == path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.required_entries.len() + self.optional_entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` declares different content, judged by format version
    /// and aggregate digest.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.format_version != other.format_version || self.aggregate_digest != other.aggregate_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = "1111111111111111111111111111111111111111111111111111111111111111";
    const H2: &str = "2222222222222222222222222222222222222222222222222222222222222222";

    #[test]
    fn test_from_json_marks_groups() {
        let json = format!(
            r#"{{"formatVersion":"1","requiredEntries":[{{"path":"core/foo.jar","contentDigest":"{H1}","sizeBytes":100}}],
               "optionalEntries":[{{"path":"mods/a.jar","contentDigest":"{H2}","sizeBytes":5}}]}}"#
        );
        let manifest = Manifest::from_json(json.as_bytes(), "test").unwrap();

        assert!(manifest.required_entries[0].required);
        assert!(!manifest.optional_entries[0].required);
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entry("mods/a.jar").unwrap().group(), Group::Optional);
    }

    #[test]
    fn test_from_json_accepts_legacy_names() {
        let json = format!(
            r#"{{"version":"7","dirHash":null,
               "required":[{{"path":"a.jar","sha256":"{H1}","size":1,"url":"/download/a.jar","mtimeMs":5}}],
               "optional":[]}}"#
        );
        let manifest = Manifest::from_json(json.as_bytes(), "legacy").unwrap();

        assert_eq!(manifest.format_version, "7");
        let entry = &manifest.required_entries[0];
        assert_eq!(entry.content_digest, H1);
        assert_eq!(entry.locator(), "/download/a.jar");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = Manifest::from_json(b"<html>", "http://x").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::ManifestParseError { .. })
        ));
    }

    #[test]
    fn test_new_computes_digest_and_round_trips() {
        let manifest = Manifest::new(
            "1",
            vec![FileEntry::new("core/foo.jar", H1, 100)],
            vec![FileEntry::new("mods/a.jar", H2, 5).with_depends_on(["core/foo.jar"])],
        )
        .unwrap();
        assert!(manifest.aggregate_digest.is_some());

        let json = manifest.to_json_pretty().unwrap();
        let parsed = Manifest::from_json(json.as_bytes(), "round-trip").unwrap();
        assert_eq!(parsed, manifest);
        assert!(!parsed.differs_from(&manifest));
    }

    #[test]
    fn test_entry_matches_ignores_digest_case() {
        let entry = FileEntry::new("a", H1.to_uppercase(), 3);
        assert!(entry.matches(H1, 3));
        assert!(!entry.matches(H1, 4));
        assert!(!entry.matches(H2, 3));
    }
}
