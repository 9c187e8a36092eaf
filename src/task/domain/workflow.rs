//! Workflow proof attached to a task.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Workflow graph submitted as proof of work.
///
/// The graph is produced by the workflow builder and stored verbatim. Only
/// its `nodes` array is inspected: completion requires a minimum node count.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use taskboard::task::domain::Workflow;
///
/// let workflow = Workflow::new(json!({
///     "nodes": [{ "id": "1", "type": "move" }, { "id": "2", "type": "scan" }],
///     "edges": [{ "source": "1", "target": "2" }],
/// }));
/// assert_eq!(workflow.node_count(), Some(2));
/// assert!(workflow.validate(2).is_ok());
/// assert!(workflow.validate(3).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow(Value);

impl Workflow {
    /// Wraps a workflow document.
    #[must_use]
    pub const fn new(document: Value) -> Self {
        Self(document)
    }

    /// Returns the number of nodes, or `None` when there is no `nodes` array.
    #[must_use]
    pub fn node_count(&self) -> Option<usize> {
        self.0.get("nodes").and_then(Value::as_array).map(Vec::len)
    }

    /// Returns the number of edges; a missing `edges` array counts as zero.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.0
            .get("edges")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Checks that the workflow has at least `minimum_blocks` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::MalformedWorkflow`] without a `nodes` array
    /// and [`TaskDomainError::WorkflowTooSmall`] when it is too short.
    pub fn validate(&self, minimum_blocks: usize) -> Result<(), TaskDomainError> {
        let found = self
            .node_count()
            .ok_or(TaskDomainError::MalformedWorkflow {
                minimum: minimum_blocks,
            })?;
        if found < minimum_blocks {
            return Err(TaskDomainError::WorkflowTooSmall {
                minimum: minimum_blocks,
                found,
            });
        }
        Ok(())
    }

    /// Returns the underlying document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the workflow, returning the underlying document.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Workflow {
    fn from(document: Value) -> Self {
        Self::new(document)
    }
}
