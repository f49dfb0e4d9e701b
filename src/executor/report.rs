//! Per-operation results of applying a plan.

use serde::Serialize;
use std::fmt;

/// Action classes, in the order the executor runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Disable,
    Enable,
    Download,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::Download => "download",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed(String),
    /// Not started because the run was cancelled
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub path: String,
    pub action: ActionKind,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Endpoint that served a download or update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl OperationOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }
}

/// Everything `apply` did, grouped by class in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    outcomes: Vec<OperationOutcome>,
}

impl ApplyReport {
    pub fn push(&mut self, outcome: OperationOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = OperationOutcome>) {
        self.outcomes.extend(outcomes);
    }

    #[must_use]
    pub fn outcomes(&self) -> &[OperationOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| matches!(o.status, OutcomeStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| matches!(o.status, OutcomeStatus::Failed(_)))
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status == OutcomeStatus::Cancelled).count()
    }

    /// Successful operations of one class.
    #[must_use]
    pub fn succeeded_count(&self, action: ActionKind) -> usize {
        self.succeeded().filter(|o| o.action == action).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
