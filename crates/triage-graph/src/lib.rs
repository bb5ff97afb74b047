//! Typed task-graph engine.
//!
//! A small DAG runtime purpose-built for orchestration pipelines whose state
//! is a fixed set of write-once fields:
//!
//! - [`state`]: the shared [`GraphState`], node output patches, and the
//!   write-once merge discipline.
//! - [`node`]: the async [`GraphNode`] contract.
//! - [`builder`]: [`GraphBuilder`] producing a validated, immutable
//!   [`TaskGraph`] (cycles, reachability, and output-field contention are
//!   construction-time failures).
//! - [`executor`]: in-degree scheduling with bounded concurrency, per-node
//!   timeouts, cooperative cancellation, and failure tagging.
//!
//! The engine knows nothing about capabilities or routing policy; node
//! implementations live with the application.

#![warn(unreachable_pub)]

pub mod builder;
pub mod executor;
pub mod node;
pub mod state;

pub use builder::{GraphBuilder, GraphDefinitionError, TaskGraph, START};
pub use executor::{
    ExecutionError, Executor, ExecutorConfig, RunId, DEFAULT_MAX_CONCURRENT_NODES,
    DEFAULT_NODE_TIMEOUT,
};
pub use node::{GraphNode, NodeError, StateSnapshot};
pub use state::{GraphState, StateError, StateField, StatePatch};

/// Crate version, surfaced for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
