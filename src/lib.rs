//! modsync - keep a game client directory in sync with a published manifest
//!
//! A server publishes a manifest listing every file a client must have
//! (required) and every component a client may switch off (optional). modsync
//! compares a local directory with that manifest and performs the minimal set
//! of downloads, updates, renames and deletes to reconcile them, without ever
//! overriding a component the user has deactivated.
//!
//! # Architecture Overview
//!
//! A sync runs as one pipeline:
//!
//! 1. [`manifest`] fetches and validates the manifest, falling back across
//!    the endpoints in [`transport::EndpointSet`]
//! 2. [`scanner`] walks the directory and hashes every file, reusing cached
//!    digests when size and mtime are unchanged
//! 3. [`version`] picks the newest version per stem in each manifest group
//! 4. [`planner`] compares local state with the manifest and produces a
//!    [`planner::ReconciliationPlan`]
//! 5. [`executor`] applies the plan concurrently, staging every download
//!    before swapping it in
//!
//! Toggling an optional component goes through [`resolver`], which computes
//! the set of components that must change state together, and [`tree`],
//! which owns the on-disk active/inactive encoding.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - Global configuration (`~/.modsync/config.toml`)
//! - [`core`] - Error types and component states
//! - [`constants`] - Tunables shared across modules
//!
//! ## Sync pipeline
//! - [`manifest`] - Manifest model, validation, fetch client and builder
//! - [`scanner`] - Content hashing, digest cache and tree scan
//! - [`version`] - Stem and version extraction from file names
//! - [`planner`] - Reconciliation planning and ignore patterns
//! - [`executor`] - Plan application and per-operation reports
//! - [`transport`] - HTTP and `file://` transports, endpoint ordering
//!
//! ## Components
//! - [`resolver`] - Dependency and conflict graph over optional components
//! - [`tree`] - Active/inactive path encoding and state changes
//!
//! ## Supporting Modules
//! - [`tasks`] - Background queue for fire-and-forget side tasks
//! - [`utils`] - Atomic writes, retrying filesystem operations, progress
//!
//! # Command-Line Usage
//!
//! ```bash
//! # What would change?
//! modsync audit ~/games/client
//!
//! # Make it so
//! modsync sync ~/games/client
//!
//! # Switch an optional component off, together with its dependents
//! modsync toggle ~/games/client mods/minimap.jar --disable
//!
//! # Publish a manifest for a mirror
//! modsync manifest build --required srv/core --optional srv/extras --format-version 42
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod executor;
pub mod manifest;
pub mod planner;
pub mod resolver;
pub mod scanner;
pub mod tasks;
pub mod transport;
pub mod tree;
pub mod utils;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
