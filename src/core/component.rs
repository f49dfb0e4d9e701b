//! Component state and manifest group types.
//!
//! An optional component is either [`ComponentState::Active`] (its file is in
//! effect) or [`ComponentState::Inactive`] (deliberately suppressed). How that
//! state is represented on disk is the business of [`crate::tree`] alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a component's file is currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Active,
    Inactive,
}

impl ComponentState {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// The manifest group an entry is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Required,
    Optional,
}

impl Group {
    /// Tag byte fed into the aggregate digest so that identical entries in
    /// different groups never hash the same.
    #[must_use]
    pub const fn digest_tag(self) -> u8 {
        match self {
            Self::Required => b'R',
            Self::Optional => b'O',
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Optional => write!(f, "optional"),
        }
    }
}
