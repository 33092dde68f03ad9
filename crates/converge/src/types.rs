//! Core types for reconciliation plans

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of mutation a [`ProposedChange`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Resource does not exist and will be created
    Create,
    /// An attribute of the resource will be rewritten
    Update,
    /// Resource (or a scoped instance of it) will be removed
    Delete,
    /// A sub-entity (tag, binding) will be added
    Attach,
    /// A sub-entity (tag, binding) will be removed
    Detach,
}

/// Immutable record of one intended mutation.
///
/// Reconcilers accumulate a sequence of these per invocation and return it
/// regardless of whether execution occurred, so a plan run reports exactly
/// what an apply run would.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChange {
    /// What kind of mutation this is
    pub change_type: ChangeType,
    /// The attribute the mutation targets (e.g. "policy_document", "tags")
    pub attribute: String,
    /// Structured diff backing the change, when one was computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<Value>,
    /// Observed value before the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Value>,
    /// Desired value after the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl ProposedChange {
    /// Create a change record with no attached values
    pub fn new(change_type: ChangeType, attribute: impl Into<String>) -> Self {
        Self {
            change_type,
            attribute: attribute.into(),
            change_summary: None,
            current_value: None,
            new_value: None,
        }
    }

    /// Attach a structured diff summary
    pub fn with_summary(mut self, summary: Value) -> Self {
        self.change_summary = Some(summary);
        self
    }

    /// Attach the observed value
    pub fn with_current(mut self, current: Value) -> Self {
        self.current_value = Some(current);
        self
    }

    /// Attach the desired value
    pub fn with_new(mut self, new: Value) -> Self {
        self.new_value = Some(new);
        self
    }
}
