//! Reconciliation planning.
//!
//! [`plan`] compares a [`LocalState`] against a [`Manifest`] and decides,
//! per path, what has to happen for the tree to match the manifest. It is a
//! pure function of its inputs: no I/O, no clock, no randomness. Running it
//! twice on the same inputs yields the same plan.
//!
//! # Classification
//!
//! 1. Required and optional entries are resolved to one canonical entry per
//!    stem, each group on its own (see [`crate::version`]).
//! 2. Local files matching an ignore pattern, and canonical entries whose
//!    path matches one, go to `skipped` and are not looked at again.
//! 3. Required entries: missing → `to_download`; present with other content
//!    → `to_update`; present and matching → `up_to_date`. A required file
//!    found only in inactive form is renamed back (`to_enable`) when its
//!    content matches, and replaced otherwise.
//! 4. Optional entries: inactive-only or absent → `skipped` (the user opted
//!    out), unless an older version of the same component is active, in
//!    which case the new version is downloaded.
//! 5. Everything on disk not claimed above is deleted: superseded versions,
//!    files the manifest does not know, inactive duplicates of active files,
//!    and leftover staging files.
//! 6. Active optional entries are checked against the tree as it will be
//!    once the plan is applied. A dependency only counts when its file is
//!    active and neither deleted nor disabled by this plan, or when it is an
//!    upgrade of an active component. Disabling one component can break
//!    another, so the check repeats until no more components drop out.
//!    Those left are `to_update` or `up_to_date` by content.
//!
//! The dependency check runs before the content check. Updating a component
//! that the next audit would disable anyway does not converge.

pub mod ignore;

pub use ignore::IgnoreSet;

use crate::manifest::{FileEntry, Manifest};
use crate::scanner::LocalState;
use crate::tree;
use crate::version;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// File-level actions that bring a tree in line with a manifest.
///
/// Every list is sorted by path and free of duplicates. Paths in
/// `to_disable`, `to_enable` and `up_to_date` are logical paths; paths in
/// `to_delete` and `skipped` are on-disk paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationPlan {
    pub to_download: Vec<FileEntry>,
    pub to_update: Vec<FileEntry>,
    pub to_delete: Vec<String>,
    pub to_disable: Vec<String>,
    pub to_enable: Vec<String>,
    pub up_to_date: Vec<String>,
    pub skipped: Vec<String>,
}

impl ReconciliationPlan {
    /// Number of file operations the plan would perform.
    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.to_download.len()
            + self.to_update.len()
            + self.to_delete.len()
            + self.to_disable.len()
            + self.to_enable.len()
    }

    /// Whether the tree already matches the manifest.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.total_operations() == 0
    }

    /// Bytes to transfer for downloads and updates.
    #[must_use]
    pub fn download_bytes(&self) -> u64 {
        self.to_download.iter().chain(&self.to_update).map(|e| e.size_bytes).sum()
    }

    fn finalize(&mut self) {
        self.to_download.sort_by(|a, b| a.path.cmp(&b.path));
        self.to_download.dedup_by(|a, b| a.path == b.path);
        self.to_update.sort_by(|a, b| a.path.cmp(&b.path));
        self.to_update.dedup_by(|a, b| a.path == b.path);
        for list in [
            &mut self.to_delete,
            &mut self.to_disable,
            &mut self.to_enable,
            &mut self.up_to_date,
            &mut self.skipped,
        ] {
            list.sort();
            list.dedup();
        }
    }
}

/// Paths already given a classification.
struct Claims {
    claimed: HashSet<String>,
}

impl Claims {
    fn claim(&mut self, path: &str) -> bool {
        self.claimed.insert(path.to_string())
    }

    fn contains(&self, path: &str) -> bool {
        self.claimed.contains(path)
    }
}

/// Compute the plan for `local` against `manifest`.
#[must_use]
pub fn plan(local: &LocalState, manifest: &Manifest, ignore: &IgnoreSet) -> ReconciliationPlan {
    let required = version::resolve(&manifest.required_entries);
    let optional = version::resolve(&manifest.optional_entries);

    let mut plan = ReconciliationPlan::default();
    let mut claims = Claims {
        claimed: HashSet::new(),
    };

    for record in local.records() {
        let (logical, _) = tree::decode(&record.path);
        if ignore.matches_local(&record.path, logical) {
            claims.claim(&record.path);
            plan.skipped.push(record.path.clone());
        }
    }

    for entry in required.values() {
        if ignore.matches(&entry.path) {
            plan.skipped.push(entry.path.clone());
            continue;
        }
        plan_required(entry, local, &mut claims, &mut plan);
    }

    let active_stems: HashSet<String> = local
        .records()
        .filter(|r| !claims.contains(&r.path) && tree::decode(&r.path).1.is_active())
        .map(|r| version::stem(&r.path))
        .collect();

    let mut candidates = Vec::new();
    for entry in optional.values().copied() {
        if ignore.matches(&entry.path) {
            plan.skipped.push(entry.path.clone());
            continue;
        }
        if let Some(candidate) = plan_optional(entry, local, &active_stems, &mut claims, &mut plan) {
            candidates.push(candidate);
        }
    }

    for record in local.records() {
        if claims.claim(&record.path) {
            tracing::trace!("Orphan {}", record.path);
            plan.to_delete.push(record.path.clone());
        }
    }

    let deleted: HashSet<&str> = plan.to_delete.iter().map(String::as_str).collect();
    let mut present: HashSet<String> = local
        .records()
        .filter(|r| tree::decode(&r.path).1.is_active() && !deleted.contains(r.path.as_str()))
        .map(|r| r.path.clone())
        .collect();
    present.extend(
        plan.to_download
            .iter()
            .filter(|e| active_stems.contains(&version::stem(&e.path)))
            .map(|e| e.path.clone()),
    );

    let disabled = settle_dependencies(&candidates, &mut present, &required, &optional);
    for candidate in candidates {
        let path = &candidate.entry.path;
        if disabled.contains(path) {
            plan.to_disable.push(path.clone());
        } else if candidate.matches {
            plan.up_to_date.push(path.clone());
        } else {
            plan.to_update.push(candidate.entry.clone());
        }
    }

    plan.finalize();
    plan
}

fn plan_required(entry: &FileEntry, local: &LocalState, claims: &mut Claims, plan: &mut ReconciliationPlan) {
    let active = local.active(&entry.path).filter(|r| !claims.contains(&r.path));
    let inactive = local.inactive(&entry.path).filter(|r| !claims.contains(&r.path));

    match (active, inactive) {
        (Some(active), inactive) => {
            claims.claim(&active.path);
            if entry.matches(&active.content_digest, active.size_bytes) {
                plan.up_to_date.push(entry.path.clone());
            } else {
                plan.to_update.push(entry.clone());
            }
            if let Some(duplicate) = inactive {
                claims.claim(&duplicate.path);
                plan.to_delete.push(duplicate.path.clone());
            }
        }
        (None, Some(inactive)) => {
            claims.claim(&inactive.path);
            if entry.matches(&inactive.content_digest, inactive.size_bytes) {
                plan.to_enable.push(entry.path.clone());
            } else {
                plan.to_download.push(entry.clone());
                plan.to_delete.push(inactive.path.clone());
            }
        }
        (None, None) => {
            // An ignored file at the target path keeps it off the download list
            if local.active(&entry.path).is_some() {
                return;
            }
            plan.to_download.push(entry.clone());
        }
    }
}

/// An active optional component still waiting for its dependency check.
struct ActiveOptional<'a> {
    entry: &'a FileEntry,
    /// Whether the local file already has the canonical content
    matches: bool,
}

fn plan_optional<'a>(
    entry: &'a FileEntry,
    local: &LocalState,
    active_stems: &HashSet<String>,
    claims: &mut Claims,
    plan: &mut ReconciliationPlan,
) -> Option<ActiveOptional<'a>> {
    let active = local.active(&entry.path).filter(|r| !claims.contains(&r.path));
    let inactive = local.inactive(&entry.path).filter(|r| !claims.contains(&r.path));

    match (active, inactive) {
        (Some(active), inactive) => {
            claims.claim(&active.path);
            if let Some(duplicate) = inactive {
                claims.claim(&duplicate.path);
                plan.to_delete.push(duplicate.path.clone());
            }
            return Some(ActiveOptional {
                entry,
                matches: entry.matches(&active.content_digest, active.size_bytes),
            });
        }
        (None, Some(inactive)) => {
            claims.claim(&inactive.path);
            plan.skipped.push(inactive.path.clone());
        }
        (None, None) => {
            if local.active(&entry.path).is_some() || local.inactive(&entry.path).is_some() {
                return None;
            }
            // An active older version means the user runs this component
            if active_stems.contains(&version::stem(&entry.path)) {
                plan.to_download.push(entry.clone());
            } else {
                plan.skipped.push(entry.path.clone());
            }
        }
    }
    None
}

/// Disable candidates with an unmet dependency until none is left.
///
/// `present` holds the paths active after the plan applies. Each disabled
/// candidate is removed from it, which may in turn break its dependents.
fn settle_dependencies(
    candidates: &[ActiveOptional<'_>],
    present: &mut HashSet<String>,
    required: &BTreeMap<String, &FileEntry>,
    optional: &BTreeMap<String, &FileEntry>,
) -> HashSet<String> {
    let mut disabled = HashSet::new();
    loop {
        let mut changed = false;
        for candidate in candidates {
            let path = &candidate.entry.path;
            if disabled.contains(path) {
                continue;
            }
            let missing: Vec<&str> = candidate
                .entry
                .depends_on
                .iter()
                .map(String::as_str)
                .filter(|dep| !dependency_present(dep, present, required, optional))
                .collect();
            if !missing.is_empty() {
                tracing::debug!("{path} is missing dependencies: {}", missing.join(", "));
                present.remove(path);
                disabled.insert(path.clone());
                changed = true;
            }
        }
        if !changed {
            return disabled;
        }
    }
}

/// A dependency is satisfied by a present file at its declared path, or at
/// the canonical path of its stem when the server has since published a
/// different version.
fn dependency_present(
    dependency: &str,
    present: &HashSet<String>,
    required: &BTreeMap<String, &FileEntry>,
    optional: &BTreeMap<String, &FileEntry>,
) -> bool {
    if present.contains(dependency) {
        return true;
    }
    let stem = version::stem(dependency);
    [required.get(&stem), optional.get(&stem)]
        .into_iter()
        .flatten()
        .any(|canonical| present.contains(&canonical.path))
}
