//! Dependency and conflict resolution for optional components.
//!
//! When a user toggles one component, other components may have to change
//! state with it. [`ComponentGraph`] computes that set as a
//! [`DependencyClosure`]; [`crate::tree::apply_closure`] performs the renames.
//!
//! ```rust
//! use modsync_cli::core::ComponentState;
//! use modsync_cli::resolver::{ComponentGraph, ComponentStates};
//!
//! let mut graph = ComponentGraph::new();
//! graph.add_dependency("mods/addon.jar", "mods/core.jar");
//!
//! let mut states = ComponentStates::new();
//! states.insert("mods/core.jar".into(), ComponentState::Inactive);
//! states.insert("mods/addon.jar".into(), ComponentState::Inactive);
//!
//! let closure = graph.closure_for_enable("mods/addon.jar", &states)?;
//! assert_eq!(closure.enable, vec!["mods/core.jar", "mods/addon.jar"]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod dependency_graph;

pub use dependency_graph::ComponentGraph;

use crate::core::ComponentState;
use serde::Serialize;
use std::collections::HashMap;

/// Current state of each component present on disk. Components absent from
/// the map are not installed in either form.
pub type ComponentStates = HashMap<String, ComponentState>;

/// A request to move one component into a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRequest {
    pub component_id: String,
    pub desired_state: ComponentState,
}

/// Components that must change state together to satisfy a toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyClosure {
    /// To activate, dependencies before dependents
    pub enable: Vec<String>,
    /// To deactivate, dependents before dependencies
    pub disable: Vec<String>,
    /// Needed for the enable but not installed; a rename cannot fix these
    pub missing: Vec<String>,
}

impl DependencyClosure {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enable.is_empty() && self.disable.is_empty()
    }

    #[must_use]
    pub fn is_satisfiable(&self) -> bool {
        self.missing.is_empty()
    }
}
