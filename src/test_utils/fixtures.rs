//! Fixtures for building game trees and mirrors on disk.

use crate::constants::{DEFAULT_LOCATOR_PREFIX, DEFAULT_MANIFEST_PATH};
use crate::manifest::{FileEntry, Manifest};
use crate::scanner::hash_bytes;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `content` at `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Every file under `root` as sorted POSIX relative paths.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// `file://` URL of a directory, usable as an endpoint.
pub fn file_url(dir: &Path) -> String {
    reqwest::Url::from_directory_path(dir)
        .map(|url| url.to_string())
        .unwrap_or_else(|()| format!("file://{}", dir.display()))
}

/// Manifest entry for `content` published at `path`.
pub fn entry(path: &str, content: impl AsRef<[u8]>) -> FileEntry {
    let content = content.as_ref();
    FileEntry::new(path, hash_bytes(content), content.len() as u64)
}

/// A mirror directory served over `file://`.
///
/// Files are stored under `files/<path>` and the manifest at
/// `launcher/manifest`, matching the default config.
pub struct MirrorFixture {
    dir: TempDir,
    required: Vec<FileEntry>,
    optional: Vec<FileEntry>,
}

impl MirrorFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            required: Vec::new(),
            optional: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn endpoint(&self) -> String {
        file_url(self.dir.path())
    }

    /// Publish a required file.
    pub fn required(&mut self, path: &str, content: impl AsRef<[u8]>) -> Result<&mut Self> {
        let entry = self.store(path, content.as_ref())?;
        self.required.push(entry);
        Ok(self)
    }

    /// Publish an optional component with its relations.
    pub fn optional(
        &mut self,
        path: &str,
        content: impl AsRef<[u8]>,
        depends_on: &[&str],
        conflicts: &[&str],
    ) -> Result<&mut Self> {
        let entry = self
            .store(path, content.as_ref())?
            .with_depends_on(depends_on.iter().copied())
            .with_conflicts(conflicts.iter().copied());
        self.optional.push(entry);
        Ok(self)
    }

    /// Overwrite a published file without updating the manifest, as a
    /// misbehaving mirror would.
    pub fn corrupt(&self, path: &str, content: impl AsRef<[u8]>) -> Result<()> {
        write_file(self.dir.path(), &format!("{DEFAULT_LOCATOR_PREFIX}{path}"), content)?;
        Ok(())
    }

    /// Write the manifest and return it.
    pub fn publish(&self, format_version: &str) -> Result<Manifest> {
        let manifest = Manifest::new(format_version, self.required.clone(), self.optional.clone())?;
        write_file(self.dir.path(), DEFAULT_MANIFEST_PATH, manifest.to_json_pretty()?)?;
        Ok(manifest)
    }

    fn store(&self, path: &str, content: &[u8]) -> Result<FileEntry> {
        let locator = format!("{DEFAULT_LOCATOR_PREFIX}{path}");
        write_file(self.dir.path(), &locator, content)?;
        Ok(entry(path, content).with_locator(locator))
    }
}
