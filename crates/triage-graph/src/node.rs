//! The node contract: an async unit of work over the shared state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::state::{GraphState, StateField, StatePatch};

/// Read-only view of the run state handed to a node at dispatch time.
///
/// Predecessors have completed and merged before dispatch, so everything a
/// node declared as an input is visible in its snapshot.
pub type StateSnapshot = Arc<GraphState>;

/// Why a single node's execution failed.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A declared input was not in the snapshot. With a validated graph this
    /// indicates a wiring bug, not bad user input.
    #[error("required state field '{0}' is not populated")]
    MissingInput(StateField),

    /// The underlying capability call failed.
    #[error("capability call failed: {0}")]
    Capability(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The capability call exceeded the executor's per-node timeout.
    #[error("capability call timed out after {0:?}")]
    Timeout(Duration),
}

impl NodeError {
    /// Wrap an adapter error as a node failure.
    #[inline]
    pub fn capability(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        NodeError::Capability(err.into())
    }
}

/// A unit of work in the task graph.
///
/// Implementations are thin glue: read declared inputs from the snapshot,
/// invoke one capability, return the declared output fields as a patch.
/// Cross-cutting concerns (timeouts, logging, retries) belong to the executor
/// or the adapter, never the node body.
#[async_trait]
pub trait GraphNode: Send + Sync {
    /// Stable node name used in edges, logs, and error tags.
    fn name(&self) -> &str;

    /// The state fields this node is allowed to write. Checked for
    /// disjointness at graph construction and enforced again at merge.
    fn writes(&self) -> &'static [StateField];

    /// Execute against a snapshot of the state at dispatch time.
    async fn run(&self, state: StateSnapshot) -> Result<StatePatch, NodeError>;
}
