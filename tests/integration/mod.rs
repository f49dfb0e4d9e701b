//! Integration test suite for modsync
//!
//! End-to-end tests against `file://` mirrors built on the fly, plus a few
//! fetch tests against the scripted mock transport.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **common**: Pipeline helpers shared by the other modules
//! - **scenarios**: The reference audit scenarios A to F
//! - **properties**: Idempotence, convergence, canonical uniqueness and ignore precedence
//! - **failover**: Endpoint fallback and integrity failures during apply
//! - **toggle**: Component closures applied to a real tree
//! - **cli**: The `modsync` binary

mod common;

mod cli;
mod failover;
mod properties;
mod scenarios;
mod toggle;
