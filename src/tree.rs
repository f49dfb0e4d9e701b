//! Filesystem adapter for component state.
//!
//! Everywhere else a component is simply [`ComponentState::Active`] or
//! [`ComponentState::Inactive`]. On disk, an inactive file carries the
//! [`INACTIVE_SUFFIX`] (`mods/foo.jar` becomes `mods/foo.jar.disabled`).
//! This module is the only place that knows about that convention.

use crate::constants::{INACTIVE_SUFFIX, STAGING_SUFFIX};
use crate::core::ComponentState;
use crate::resolver::DependencyClosure;
use crate::utils::fs::{join_relative, remove_file_with_retry, rename_with_retry};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Split an on-disk relative path into its logical path and state.
#[must_use]
pub fn decode(raw: &str) -> (&str, ComponentState) {
    match raw.strip_suffix(INACTIVE_SUFFIX) {
        Some(logical) if !logical.is_empty() && !logical.ends_with('/') => {
            (logical, ComponentState::Inactive)
        }
        _ => (raw, ComponentState::Active),
    }
}

/// On-disk relative path of a logical path in the given state.
#[must_use]
pub fn encode(logical: &str, state: ComponentState) -> String {
    match state {
        ComponentState::Active => logical.to_string(),
        ComponentState::Inactive => format!("{logical}{INACTIVE_SUFFIX}"),
    }
}

/// Path a download of `target` is staged at before being swapped in.
#[must_use]
pub fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(STAGING_SUFFIX);
    target.with_file_name(name)
}

/// Current state of a logical path on disk, preferring the active form when
/// both exist. `None` when neither exists.
pub async fn current_state(root: &Path, logical: &str) -> Result<Option<ComponentState>> {
    let active = join_relative(root, logical)?;
    if tokio::fs::try_exists(&active).await.unwrap_or(false) {
        return Ok(Some(ComponentState::Active));
    }
    let inactive = join_relative(root, &encode(logical, ComponentState::Inactive))?;
    if tokio::fs::try_exists(&inactive).await.unwrap_or(false) {
        return Ok(Some(ComponentState::Inactive));
    }
    Ok(None)
}

/// States of every id in `ids` that exists on disk in either form.
pub async fn component_states<'a, I>(root: &Path, ids: I) -> Result<HashMap<String, ComponentState>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut states = HashMap::new();
    for id in ids {
        if let Some(state) = current_state(root, id).await? {
            states.insert(id.to_string(), state);
        }
    }
    Ok(states)
}

/// Move a logical path into `desired` state by renaming.
///
/// Idempotent: a file already in the desired state is left alone. When both
/// forms exist the stale one is removed.
pub async fn set_state(root: &Path, logical: &str, desired: ComponentState) -> Result<()> {
    let desired_path = join_relative(root, &encode(logical, desired))?;
    let other_path = join_relative(root, &encode(logical, desired.toggled()))?;

    let desired_exists = tokio::fs::try_exists(&desired_path).await.unwrap_or(false);
    let other_exists = tokio::fs::try_exists(&other_path).await.unwrap_or(false);

    match (desired_exists, other_exists) {
        (true, false) => Ok(()),
        (true, true) => {
            // Active wins an anomaly; when deactivating, the active file is the one to keep
            if desired.is_active() {
                remove_file_with_retry(&other_path).await
            } else {
                remove_file_with_retry(&desired_path).await?;
                rename_with_retry(&other_path, &desired_path).await
            }
        }
        (false, true) => {
            tracing::debug!("Setting {logical} {desired}");
            rename_with_retry(&other_path, &desired_path).await
        }
        (false, false) => Err(anyhow::anyhow!("{logical} is not present in {}", root.display())),
    }
}

/// Perform the renames of a closure: disables first (in order), then enables.
///
/// Returns the ids that were changed.
pub async fn apply_closure(root: &Path, closure: &DependencyClosure) -> Result<Vec<String>> {
    let mut changed = Vec::new();
    for id in &closure.disable {
        set_state(root, id, ComponentState::Inactive)
            .await
            .with_context(|| format!("Failed to disable {id}"))?;
        changed.push(id.clone());
    }
    for id in &closure.enable {
        set_state(root, id, ComponentState::Active)
            .await
            .with_context(|| format!("Failed to enable {id}"))?;
        changed.push(id.clone());
    }
    Ok(changed)
}
