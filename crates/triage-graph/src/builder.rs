//! Graph construction and validation.
//!
//! [`GraphBuilder`] accumulates nodes and edges, then [`GraphBuilder::build`]
//! consumes it and returns a validated, immutable [`TaskGraph`]. Everything
//! that can be wrong with a graph definition is caught here, fatally, before
//! any request runs:
//!
//! - cycles and self-loops,
//! - unknown or duplicate nodes/edges,
//! - nodes unreachable from the [`START`] marker,
//! - two nodes claiming the same output field.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use thiserror::Error;

use crate::node::GraphNode;
use crate::state::StateField;

/// Virtual source marker. An edge `START -> n` declares `n` eligible as soon
/// as a run begins; `START` is not a node and cannot be an edge target.
pub const START: &str = "__start__";

/// Fatal construction-time graph errors. Never produced at request time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphDefinitionError {
    #[error("graph has no nodes")]
    EmptyGraph,

    #[error("node '{0}' is already registered")]
    DuplicateNode(String),

    #[error("node name '{0}' is reserved")]
    ReservedName(String),

    #[error("edge references unknown node '{0}'")]
    UnknownNode(String),

    #[error("self-loop on node '{0}' is not allowed")]
    SelfLoop(String),

    #[error("edge '{from}' -> '{to}' is already registered")]
    DuplicateEdge { from: String, to: String },

    #[error("edges may not target the start marker")]
    EdgeIntoStart,

    #[error("cycle detected through node '{0}'")]
    CycleDetected(String),

    #[error("node '{0}' is unreachable from the start marker")]
    UnreachableNode(String),

    #[error("state field '{field}' is claimed by nodes '{first}' and '{second}'")]
    FieldContention {
        field: StateField,
        first: String,
        second: String,
    },
}

/// Mutable accumulator for a graph definition.
///
/// Nodes must be registered before edges that reference them.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: IndexMap<String, Arc<dyn GraphNode>>,
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under its own [`GraphNode::name`].
    pub fn add_node<N>(&mut self, node: N) -> Result<(), GraphDefinitionError>
    where
        N: GraphNode + 'static,
    {
        let name = node.name().to_string();
        if name == START || name.is_empty() {
            return Err(GraphDefinitionError::ReservedName(name));
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphDefinitionError::DuplicateNode(name));
        }
        self.nodes.insert(name, Arc::new(node));
        Ok(())
    }

    /// Register an execution-order edge: `to` must not start until `from`
    /// has completed. `from` may be [`START`].
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphDefinitionError> {
        if to == START {
            return Err(GraphDefinitionError::EdgeIntoStart);
        }
        if from == to {
            return Err(GraphDefinitionError::SelfLoop(from.to_string()));
        }
        if from != START && !self.nodes.contains_key(from) {
            return Err(GraphDefinitionError::UnknownNode(from.to_string()));
        }
        if !self.nodes.contains_key(to) {
            return Err(GraphDefinitionError::UnknownNode(to.to_string()));
        }
        let edge = (from.to_string(), to.to_string());
        if self.edges.contains(&edge) {
            return Err(GraphDefinitionError::DuplicateEdge {
                from: edge.0,
                to: edge.1,
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Validate and freeze the definition.
    pub fn build(self) -> Result<TaskGraph, GraphDefinitionError> {
        if self.nodes.is_empty() {
            return Err(GraphDefinitionError::EmptyGraph);
        }

        // Writer disjointness: every state field has at most one producer.
        let mut writers: HashMap<StateField, String> = HashMap::new();
        for (name, node) in &self.nodes {
            for field in node.writes() {
                if let Some(first) = writers.get(field) {
                    return Err(GraphDefinitionError::FieldContention {
                        field: *field,
                        first: first.clone(),
                        second: name.clone(),
                    });
                }
                writers.insert(*field, name.clone());
            }
        }

        // Cycle check and topological order over the index graph.
        // START occupies index 0; node i sits at i + 1.
        let index_of = |name: &str| -> usize {
            if name == START {
                0
            } else {
                self.nodes.get_index_of(name).map_or(usize::MAX, |i| i + 1)
            }
        };
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        graph.add_node(0);
        for i in 0..self.nodes.len() {
            graph.add_node(i + 1);
        }
        for (from, to) in &self.edges {
            graph.add_edge(index_of(from), index_of(to), ());
        }
        let order = match toposort(&graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                let name = cycle
                    .node_id()
                    .checked_sub(1)
                    .and_then(|i| self.nodes.get_index(i))
                    .map_or_else(|| START.to_string(), |(name, _)| name.clone());
                return Err(GraphDefinitionError::CycleDetected(name));
            }
        };
        let order: Vec<String> = order
            .into_iter()
            .filter(|idx| *idx != 0)
            .filter_map(|idx| self.nodes.get_index(idx - 1))
            .map(|(name, _)| name.clone())
            .collect();

        // In-degrees (START edges count) and successor lists.
        let mut in_degree: HashMap<String, usize> =
            self.nodes.keys().map(|name| (name.clone(), 0)).collect();
        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        let mut start_successors: Vec<String> = Vec::new();
        for (from, to) in &self.edges {
            *in_degree
                .get_mut(to)
                .ok_or_else(|| GraphDefinitionError::UnknownNode(to.clone()))? += 1;
            if from == START {
                start_successors.push(to.clone());
            } else {
                successors.entry(from.clone()).or_default().push(to.clone());
            }
        }

        // Acyclic plus "every node has a predecessor" implies every node
        // traces back to START.
        for (name, degree) in &in_degree {
            if *degree == 0 {
                return Err(GraphDefinitionError::UnreachableNode(name.clone()));
            }
        }

        Ok(TaskGraph {
            nodes: self.nodes,
            edges: self.edges,
            in_degree,
            successors,
            start_successors,
            writers,
            order,
        })
    }
}

/// A validated, immutable task graph. Built once at startup, shared by value
/// reference across requests.
pub struct TaskGraph {
    nodes: IndexMap<String, Arc<dyn GraphNode>>,
    edges: Vec<(String, String)>,
    in_degree: HashMap<String, usize>,
    successors: HashMap<String, Vec<String>>,
    start_successors: Vec<String>,
    writers: HashMap<StateField, String>,
    order: Vec<String>,
}

impl TaskGraph {
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Arc<dyn GraphNode>> {
        self.nodes.get(name)
    }

    /// Nodes eligible as soon as a run begins.
    #[inline]
    #[must_use]
    pub fn entry_nodes(&self) -> &[String] {
        &self.start_successors
    }

    #[must_use]
    pub fn successors_of(&self, name: &str) -> &[String] {
        self.successors.get(name).map_or(&[], Vec::as_slice)
    }

    /// Per-node in-degree, START edges included. Cloned per run as the
    /// countdown table.
    #[inline]
    #[must_use]
    pub fn in_degrees(&self) -> &HashMap<String, usize> {
        &self.in_degree
    }

    /// The node registered as producer of `field`, if any.
    #[must_use]
    pub fn writer_of(&self, field: StateField) -> Option<&str> {
        self.writers.get(&field).map(String::as_str)
    }

    /// A valid topological order of the nodes. Informational; the executor
    /// schedules by in-degree, not by this list.
    #[inline]
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeError, StateSnapshot};
    use crate::state::StatePatch;
    use async_trait::async_trait;

    struct TestNode {
        name: &'static str,
        writes: &'static [StateField],
    }

    impl TestNode {
        fn named(name: &'static str) -> Self {
            Self { name, writes: &[] }
        }

        fn writing(name: &'static str, writes: &'static [StateField]) -> Self {
            Self { name, writes }
        }
    }

    #[async_trait]
    impl GraphNode for TestNode {
        fn name(&self) -> &str {
            self.name
        }

        fn writes(&self) -> &'static [StateField] {
            self.writes
        }

        async fn run(&self, _state: StateSnapshot) -> Result<StatePatch, NodeError> {
            Ok(StatePatch::new())
        }
    }

    fn diamond() -> GraphBuilder {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::named("a")).unwrap();
        b.add_node(TestNode::named("b")).unwrap();
        b.add_node(TestNode::named("c")).unwrap();
        b.add_node(TestNode::named("d")).unwrap();
        b.add_edge(START, "a").unwrap();
        b.add_edge(START, "b").unwrap();
        b.add_edge("a", "c").unwrap();
        b.add_edge("b", "c").unwrap();
        b.add_edge("c", "d").unwrap();
        b
    }

    #[test]
    fn builds_a_diamond() {
        let graph = diamond().build().expect("valid diamond");
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.entry_nodes(), &["a", "b"]);
        assert_eq!(graph.successors_of("a"), &["c"]);
        assert_eq!(graph.in_degrees()["c"], 2);
        assert_eq!(graph.in_degrees()["a"], 1);
    }

    #[test]
    fn execution_order_respects_dependencies() {
        let graph = diamond().build().unwrap();
        let order = graph.execution_order();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("c"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn rejects_duplicate_node() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::named("a")).unwrap();
        let err = b.add_node(TestNode::named("a")).unwrap_err();
        assert_eq!(err, GraphDefinitionError::DuplicateNode("a".to_string()));
    }

    #[test]
    fn rejects_reserved_name() {
        let mut b = GraphBuilder::new();
        let err = b.add_node(TestNode::named(START)).unwrap_err();
        assert!(matches!(err, GraphDefinitionError::ReservedName(_)));
    }

    #[test]
    fn rejects_unknown_edge_endpoints() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::named("a")).unwrap();
        assert_eq!(
            b.add_edge("a", "ghost").unwrap_err(),
            GraphDefinitionError::UnknownNode("ghost".to_string())
        );
        assert_eq!(
            b.add_edge("ghost", "a").unwrap_err(),
            GraphDefinitionError::UnknownNode("ghost".to_string())
        );
    }

    #[test]
    fn rejects_self_loop_and_start_target() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::named("a")).unwrap();
        assert_eq!(
            b.add_edge("a", "a").unwrap_err(),
            GraphDefinitionError::SelfLoop("a".to_string())
        );
        assert_eq!(
            b.add_edge("a", START).unwrap_err(),
            GraphDefinitionError::EdgeIntoStart
        );
    }

    #[test]
    fn rejects_duplicate_edge() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::named("a")).unwrap();
        b.add_node(TestNode::named("b")).unwrap();
        b.add_edge("a", "b").unwrap();
        assert!(matches!(
            b.add_edge("a", "b").unwrap_err(),
            GraphDefinitionError::DuplicateEdge { .. }
        ));
    }

    #[test]
    fn rejects_empty_graph() {
        assert_eq!(
            GraphBuilder::new().build().unwrap_err(),
            GraphDefinitionError::EmptyGraph
        );
    }

    #[test]
    fn detects_cycle() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::named("a")).unwrap();
        b.add_node(TestNode::named("b")).unwrap();
        b.add_node(TestNode::named("c")).unwrap();
        b.add_edge(START, "a").unwrap();
        b.add_edge("a", "b").unwrap();
        b.add_edge("b", "c").unwrap();
        b.add_edge("c", "a").unwrap();
        assert!(matches!(
            b.build().unwrap_err(),
            GraphDefinitionError::CycleDetected(_)
        ));
    }

    #[test]
    fn rejects_node_without_predecessor() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::named("a")).unwrap();
        b.add_node(TestNode::named("orphan")).unwrap();
        b.add_edge(START, "a").unwrap();
        assert_eq!(
            b.build().unwrap_err(),
            GraphDefinitionError::UnreachableNode("orphan".to_string())
        );
    }

    #[test]
    fn rejects_contended_output_field() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::writing("a", &[StateField::Answer]))
            .unwrap();
        b.add_node(TestNode::writing("b", &[StateField::Answer]))
            .unwrap();
        b.add_edge(START, "a").unwrap();
        b.add_edge("a", "b").unwrap();
        let err = b.build().unwrap_err();
        assert_eq!(
            err,
            GraphDefinitionError::FieldContention {
                field: StateField::Answer,
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
    }

    #[test]
    fn writer_lookup_matches_declarations() {
        let mut b = GraphBuilder::new();
        b.add_node(TestNode::writing("a", &[StateField::Context]))
            .unwrap();
        b.add_edge(START, "a").unwrap();
        let graph = b.build().unwrap();
        assert_eq!(graph.writer_of(StateField::Context), Some("a"));
        assert_eq!(graph.writer_of(StateField::Answer), None);
    }
}
