//! Concurrent graph execution.
//!
//! The executor walks a validated [`TaskGraph`] by in-degree countdown: entry
//! nodes are dispatched immediately, every completion merges that node's
//! patch and releases any successor whose remaining in-degree reaches zero.
//! Independent nodes run concurrently up to a configurable limit; each node
//! call is wrapped in a per-node timeout.
//!
//! Merges happen exclusively in the run loop, one completion at a time, so
//! the state needs no lock: the loop is the single writer, spawned nodes only
//! ever see an immutable snapshot.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::builder::TaskGraph;
use crate::node::{NodeError, StateSnapshot};
use crate::state::{GraphState, StateError, StatePatch};

/// Correlates all log lines of one graph run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Ulid);

impl RunId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default ceiling on concurrently running nodes.
pub const DEFAULT_MAX_CONCURRENT_NODES: usize = 8;
/// Default per-node capability timeout.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunable execution parameters.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Ceiling on concurrently running nodes. Values below 1 are treated
    /// as 1.
    pub max_concurrent_nodes: usize,
    /// Per-node timeout; an expired call fails the run like any other
    /// capability error.
    pub node_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: DEFAULT_MAX_CONCURRENT_NODES,
            node_timeout: DEFAULT_NODE_TIMEOUT,
        }
    }
}

impl ExecutorConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_max_concurrent_nodes(mut self, limit: usize) -> Self {
        self.max_concurrent_nodes = limit;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }
}

/// Terminal failure of one graph run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A node's capability call failed or timed out. Carries the state
    /// accumulated before the failure for diagnostics; the partial state is
    /// never a successful result.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: NodeError,
        partial: Box<GraphState>,
    },

    /// The run was cancelled; results of in-flight nodes were discarded.
    #[error("graph run cancelled")]
    Cancelled,

    /// Write-once discipline violated during merge.
    #[error(transparent)]
    State(#[from] StateError),

    /// Scheduler invariant violated. Indicates a bug, not bad input.
    #[error("executor invariant violated: {0}")]
    Internal(String),
}

impl ExecutionError {
    /// Name of the failing node, when one is to blame.
    #[must_use]
    pub fn failed_node(&self) -> Option<&str> {
        match self {
            ExecutionError::NodeFailed { node, .. } => Some(node),
            _ => None,
        }
    }

    /// State accumulated before the failure, for diagnostics.
    #[must_use]
    pub fn partial_state(&self) -> Option<&GraphState> {
        match self {
            ExecutionError::NodeFailed { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Whether this is an adapter failure (error or timeout) as opposed to a
    /// wiring or scheduling bug.
    #[must_use]
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            ExecutionError::NodeFailed {
                source: NodeError::Capability(_) | NodeError::Timeout(_),
                ..
            }
        )
    }
}

struct NodeRun {
    name: String,
    outcome: Result<StatePatch, NodeError>,
    elapsed: Duration,
}

/// Drives graph runs. Cheap to construct; holds only configuration.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the graph to completion against `initial`.
    ///
    /// Returns the fully merged state, or the first failure tagged with the
    /// offending node. On failure, pending nodes are not dispatched and
    /// in-flight siblings are aborted.
    pub async fn run(
        &self,
        graph: &TaskGraph,
        initial: GraphState,
    ) -> Result<GraphState, ExecutionError> {
        self.run_with_cancellation(graph, initial, &CancellationToken::new())
            .await
    }

    /// [`Executor::run`] with cooperative cancellation. A cancelled run
    /// returns [`ExecutionError::Cancelled`] without merging results from
    /// nodes still in flight.
    pub async fn run_with_cancellation(
        &self,
        graph: &TaskGraph,
        initial: GraphState,
        cancel: &CancellationToken,
    ) -> Result<GraphState, ExecutionError> {
        let run_id = RunId::new();
        let run_started = Instant::now();
        let limit = self.config.max_concurrent_nodes.max(1);
        let total = graph.node_count();

        let mut state = initial;
        let mut in_degree = graph.in_degrees().clone();
        let mut ready: VecDeque<String> = VecDeque::new();
        let mut tasks: JoinSet<NodeRun> = JoinSet::new();
        let mut completed = 0usize;

        // The virtual start marker completes at t=0, releasing entry nodes.
        for name in graph.entry_nodes() {
            if let Some(remaining) = in_degree.get_mut(name) {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    ready.push_back(name.clone());
                }
            }
        }

        loop {
            while tasks.len() < limit {
                let Some(name) = ready.pop_front() else { break };
                let Some(node) = graph.node(&name) else {
                    return Err(ExecutionError::Internal(format!(
                        "ready node '{name}' is not in the graph"
                    )));
                };
                let node = Arc::clone(node);
                let snapshot: StateSnapshot = Arc::new(state.clone());
                let node_timeout = self.config.node_timeout;
                debug!(%run_id, node = %name, "dispatching node");
                tasks.spawn(async move {
                    let started = Instant::now();
                    let outcome = match timeout(node_timeout, node.run(snapshot)).await {
                        Ok(result) => result,
                        Err(_) => Err(NodeError::Timeout(node_timeout)),
                    };
                    NodeRun {
                        name,
                        outcome,
                        elapsed: started.elapsed(),
                    }
                });
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    warn!(%run_id, "graph run cancelled");
                    return Err(ExecutionError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Err(join_err)) => {
                        tasks.abort_all();
                        return Err(ExecutionError::Internal(format!(
                            "node task aborted unexpectedly: {join_err}"
                        )));
                    }
                    Some(Ok(NodeRun { name, outcome, elapsed })) => match outcome {
                        Ok(patch) => {
                            let declared = graph.node(&name).map_or(&[][..], |n| n.writes());
                            state.merge(&name, declared, patch)?;
                            completed += 1;
                            debug!(
                                %run_id,
                                node = %name,
                                elapsed_ms = elapsed.as_millis() as u64,
                                "node completed"
                            );
                            for successor in graph.successors_of(&name) {
                                if let Some(remaining) = in_degree.get_mut(successor) {
                                    *remaining = remaining.saturating_sub(1);
                                    if *remaining == 0 {
                                        ready.push_back(successor.clone());
                                    }
                                }
                            }
                        }
                        Err(error) => {
                            tasks.abort_all();
                            warn!(%run_id, node = %name, %error, "node failed; aborting run");
                            return Err(ExecutionError::NodeFailed {
                                node: name,
                                source: error,
                                partial: Box::new(state),
                            });
                        }
                    },
                },
            }
        }

        if completed != total {
            return Err(ExecutionError::Internal(format!(
                "run stalled: {completed} of {total} nodes completed"
            )));
        }

        info!(
            %run_id,
            nodes = total,
            elapsed_ms = run_started.elapsed().as_millis() as u64,
            "graph run complete"
        );
        Ok(state)
    }
}
