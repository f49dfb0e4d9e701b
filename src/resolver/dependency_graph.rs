//! Component dependency graph.
//!
//! Nodes are component ids (manifest entry paths). An edge `A -> B` means
//! "A depends on B": B must be active whenever A is. Conflicts are kept
//! beside the graph as a symmetric relation.
//!
//! The graph is built from a validated manifest and is rejected at build time
//! if it contains a cycle, so every walk below terminates. Only canonical
//! entries (see [`crate::version::resolve`]) become components. A relation
//! naming a superseded version points at the canonical entry of its stem,
//! and toggling a superseded id is refused, since the next sync would delete
//! that file again.
//!
//! # Closures
//!
//! - **Enable**: depth-first from the requested component, dependencies
//!   before dependents, so activating in list order never leaves an active
//!   component with an inactive dependency.
//! - **Disable**: breadth-first over dependents to collect everything that
//!   transitively needs the target, returned dependents-first.
//! - **Conflicts**: enabling A forces every active component conflicting
//!   with anything in A's enable set into the disable list, together with
//!   that component's own dependents.

use anyhow::{Result, anyhow};
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::{ComponentStates, DependencyClosure, ToggleRequest};
use crate::core::{ComponentState, SyncError};
use crate::manifest::{FileEntry, Manifest};
use crate::version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Depends-on and conflict relations between components.
#[derive(Debug, Default)]
pub struct ComponentGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    conflicts: HashMap<String, BTreeSet<String>>,
    required: HashSet<String>,
    /// Superseded manifest path -> canonical path of the same stem
    superseded: HashMap<String, String>,
}

impl ComponentGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of the canonical manifest entries and check it for
    /// cycles.
    ///
    /// `dependsOn`/`conflictWith` references to paths the manifest does not
    /// declare are ignored.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let required = version::resolve(&manifest.required_entries);
        let optional = version::resolve(&manifest.optional_entries);

        let mut graph = Self::new();
        for entry in required.values() {
            graph.add_component(&entry.path);
            graph.required.insert(entry.path.clone());
        }
        for entry in optional.values() {
            graph.add_component(&entry.path);
        }

        for (group, canonical) in [(&manifest.required_entries, &required), (&manifest.optional_entries, &optional)] {
            for entry in group {
                if graph.contains(&entry.path) {
                    continue;
                }
                if let Some(winner) = canonical.get(&version::stem(&entry.path)) {
                    graph.superseded.insert(entry.path.clone(), winner.path.clone());
                }
            }
        }

        let canonical: Vec<&FileEntry> = required.values().chain(optional.values()).copied().collect();
        for entry in canonical {
            for dep in &entry.depends_on {
                let dep = graph.canonical_id(dep).to_string();
                if graph.contains(&dep) {
                    graph.add_dependency(&entry.path, &dep);
                } else {
                    tracing::debug!("{} depends on undeclared {dep}; ignoring", entry.path);
                }
            }
            for other in &entry.conflict_with {
                let other = graph.canonical_id(other).to_string();
                if graph.contains(&other) {
                    graph.add_conflict(&entry.path, &other);
                }
            }
        }

        graph.detect_cycles()?;
        Ok(graph)
    }

    /// The component standing for `id`: the canonical entry of its stem when
    /// `id` is a superseded version, `id` itself otherwise.
    #[must_use]
    pub fn canonical_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.superseded.get(id).map_or(id, String::as_str)
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(id) {
            index
        } else {
            let index = self.graph.add_node(id.to_string());
            self.node_map.insert(id.to_string(), index);
            index
        }
    }

    pub fn add_component(&mut self, id: &str) {
        self.ensure_node(id);
    }

    /// Record that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Record that `a` and `b` may not be active together.
    pub fn add_conflict(&mut self, a: &str, b: &str) {
        self.ensure_node(a);
        self.ensure_node(b);
        self.conflicts.entry(a.to_string()).or_default().insert(b.to_string());
        self.conflicts.entry(b.to_string()).or_default().insert(a.to_string());
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    #[must_use]
    pub fn is_required(&self, id: &str) -> bool {
        self.required.contains(id)
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Component ids in insertion order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    fn neighbors_sorted(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<&str> =
            self.graph.neighbors_directed(idx, direction).map(|n| self.graph[n].as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Direct dependencies of `id`, sorted.
    #[must_use]
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.neighbors_sorted(id, Direction::Outgoing)
    }

    /// Direct dependents of `id`, sorted.
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.neighbors_sorted(id, Direction::Incoming)
    }

    #[must_use]
    pub fn conflicts_of(&self, id: &str) -> Vec<&str> {
        self.conflicts.get(id).map(|set| set.iter().map(String::as_str).collect()).unwrap_or_default()
    }

    /// Fail with [`SyncError::CircularDependency`] naming the cycle, if any.
    pub fn detect_cycles(&self) -> Result<()> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                let chain = cycle.iter().map(|idx| self.graph[*idx].as_str()).collect::<Vec<_>>().join(" -> ");
                return Err(SyncError::CircularDependency {
                    chain,
                }
                .into());
            }
        }

        Ok(())
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Every component ordered dependents-first.
    fn dependents_first(&self) -> Result<Vec<&str>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            anyhow!(SyncError::CircularDependency {
                chain: self.graph[cycle.node_id()].clone(),
            })
        })?;
        Ok(order.into_iter().map(|idx| self.graph[idx].as_str()).collect())
    }

    fn check_known(&self, id: &str) -> Result<()> {
        if self.contains(id) {
            return Ok(());
        }
        if let Some(canonical) = self.superseded.get(id) {
            return Err(anyhow!("{id} is an old version superseded by {canonical}; toggle {canonical} instead"));
        }
        Err(SyncError::UnknownComponent {
            id: id.to_string(),
            suggestion: self.suggest(id),
        }
        .into())
    }

    /// Closest known component id to `id`, if reasonably close.
    #[must_use]
    pub fn suggest(&self, id: &str) -> Option<String> {
        self.components()
            .map(|candidate| (strsim::normalized_levenshtein(id, candidate), candidate))
            .filter(|(score, _)| *score >= 0.6)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, candidate)| candidate.to_string())
    }

    /// Components to activate, parents first, so that `id` becomes active.
    ///
    /// Already-active components are omitted. Dependencies not present on
    /// disk at all cannot be activated by a rename and are reported in
    /// [`DependencyClosure::missing`]. Active components conflicting with the
    /// enable set are placed in [`DependencyClosure::disable`].
    pub fn closure_for_enable(&self, id: &str, states: &ComponentStates) -> Result<DependencyClosure> {
        self.check_known(id)?;

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.visit_dependencies(id, &mut visited, &mut order);

        let mut closure = DependencyClosure::default();
        for component in &order {
            match states.get(*component) {
                Some(ComponentState::Active) => {}
                Some(ComponentState::Inactive) => closure.enable.push((*component).to_string()),
                None => closure.missing.push((*component).to_string()),
            }
        }

        // Everything in `order` ends up active
        let enable_set: HashSet<&str> = order.iter().copied().collect();
        let mut to_disable: HashSet<&str> = HashSet::new();
        for component in &order {
            for other in self.conflicts_of(component) {
                if enable_set.contains(other) {
                    return Err(SyncError::ConflictingComponents {
                        first: (*component).to_string(),
                        second: other.to_string(),
                    }
                    .into());
                }
                if states.get(other).is_some_and(|s| s.is_active()) {
                    for victim in self.collect_dependents(other) {
                        if enable_set.contains(victim) {
                            return Err(SyncError::ConflictingComponents {
                                first: (*component).to_string(),
                                second: other.to_string(),
                            }
                            .into());
                        }
                        if !states.get(victim).is_some_and(|s| s.is_active()) {
                            continue;
                        }
                        if self.is_required(victim) {
                            return Err(SyncError::ConflictingComponents {
                                first: (*component).to_string(),
                                second: victim.to_string(),
                            }
                            .into());
                        }
                        to_disable.insert(victim);
                    }
                }
            }
        }

        closure.disable = self
            .dependents_first()?
            .into_iter()
            .filter(|c| to_disable.contains(c))
            .map(str::to_string)
            .collect();

        Ok(closure)
    }

    fn visit_dependencies<'a>(&'a self, id: &'a str, visited: &mut HashSet<&'a str>, order: &mut Vec<&'a str>) {
        if !visited.insert(id) {
            return;
        }
        for dep in self.dependencies(id) {
            if !visited.contains(dep) {
                self.visit_dependencies(dep, visited, order);
            }
        }
        order.push(id);
    }

    /// `id` and every component that transitively depends on it, breadth-first.
    fn collect_dependents<'a>(&'a self, id: &'a str) -> Vec<&'a str> {
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        let mut collected = Vec::new();

        while let Some(current) = queue.pop_front() {
            collected.push(current);
            for dependent in self.dependents(current) {
                if seen.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }
        collected
    }

    /// Components to deactivate, dependents first, so that `id` becomes inactive.
    ///
    /// Only currently active components are listed. Required components
    /// cannot be deactivated.
    pub fn closure_for_disable(&self, id: &str, states: &ComponentStates) -> Result<DependencyClosure> {
        self.check_known(id)?;
        if self.is_required(id) {
            return Err(anyhow!("{id} is required and cannot be disabled"));
        }

        let affected: HashSet<&str> = self
            .collect_dependents(id)
            .into_iter()
            .filter(|c| states.get(*c).is_some_and(|s| s.is_active()))
            .collect();

        let disable = self
            .dependents_first()?
            .into_iter()
            .filter(|c| affected.contains(c))
            .map(str::to_string)
            .collect();

        Ok(DependencyClosure {
            disable,
            ..DependencyClosure::default()
        })
    }

    /// Resolve a toggle request into a closure.
    pub fn toggle(&self, request: &ToggleRequest, states: &ComponentStates) -> Result<DependencyClosure> {
        match request.desired_state {
            ComponentState::Active => self.closure_for_enable(&request.component_id, states),
            ComponentState::Inactive => self.closure_for_disable(&request.component_id, states),
        }
    }

    /// Inactive optional components whose dependencies are all active now.
    ///
    /// These are never activated automatically, since inactive may mean the
    /// user opted out.
    #[must_use]
    pub fn newly_satisfiable(&self, states: &ComponentStates) -> Vec<String> {
        let mut ready: Vec<String> = self
            .components()
            .filter(|c| !self.is_required(c))
            .filter(|c| matches!(states.get(*c), Some(ComponentState::Inactive)))
            .filter(|c| {
                let deps = self.dependencies(c);
                !deps.is_empty() && deps.iter().all(|d| states.get(*d).is_some_and(|s| s.is_active()))
            })
            .map(str::to_string)
            .collect();
        ready.sort();
        ready
    }
}
