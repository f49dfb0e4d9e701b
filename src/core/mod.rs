//! Core types shared by every modsync module.
//!
//! - [`error`] holds the error taxonomy and user-facing error rendering.
//! - [`component`] holds the small value types that describe a managed file:
//!   which manifest group it belongs to and whether it is active.

pub mod component;
pub mod error;

pub use component::{ComponentState, Group};
pub use error::{ErrorContext, SyncError, user_friendly_error};
