//! JSON-Patch operations applied to base documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation kinds supported on base documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Adds or replaces the value at `path`.
    Add,
    /// Removes the value at `path`.
    Remove,
}

/// A single JSON-Patch operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    op: PatchOp,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl PatchOperation {
    /// Builds an `add` operation.
    #[must_use]
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Builds a `remove` operation. Removals never carry a value.
    #[must_use]
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }

    /// Returns the operation kind.
    #[must_use]
    pub const fn op(&self) -> PatchOp {
        self.op
    }

    /// Returns the target path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the value for `add` operations.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}
