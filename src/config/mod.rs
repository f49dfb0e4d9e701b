//! Configuration for modsync.
//!
//! The only configuration file is the user-wide [`SyncConfig`] in
//! `global`. Command-line flags override individual values per run.

pub mod global;

pub use global::{CONFIG_ENV, SyncConfig, expand_path};
