//! Engine-level behavior: merge determinism, real concurrency, failure
//! isolation, cancellation, timeouts, and construction properties.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use proptest::prelude::*;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

use triage_graph::{
    ExecutionError, Executor, ExecutorConfig, GraphBuilder, GraphDefinitionError, GraphNode,
    GraphState, NodeError, StateField, StatePatch, StateSnapshot, START,
};
use triage_ticket::{Answer, Classification, ContextChunk, Label, Priority};

fn field_slice(field: StateField) -> &'static [StateField] {
    match field {
        StateField::Classification => &[StateField::Classification],
        StateField::Context => &[StateField::Context],
        StateField::Answer => &[StateField::Answer],
        StateField::Confidence => &[StateField::Confidence],
        StateField::Resolution => &[StateField::Resolution],
    }
}

fn canned_patch(field: StateField) -> StatePatch {
    match field {
        StateField::Classification => StatePatch::new().with_classification(Classification::new(
            vec![Label::HowTo],
            "Neutral",
            Priority::P2,
        )),
        StateField::Context => StatePatch::new()
            .with_context(vec![ContextChunk::new("chunk").with_source("docs/a")]),
        StateField::Answer => StatePatch::new().with_answer(Answer::new("canned answer")),
        StateField::Confidence => StatePatch::new().with_confidence(0.9),
        StateField::Resolution => StatePatch::new(),
    }
}

/// Writes one canned field after an optional delay; can be scripted to fail.
struct ScriptedNode {
    name: String,
    field: StateField,
    delay: Duration,
    fail: bool,
}

impl ScriptedNode {
    fn writer(name: &str, field: StateField) -> Self {
        Self {
            name: name.to_string(),
            field,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl GraphNode for ScriptedNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn writes(&self) -> &'static [StateField] {
        field_slice(self.field)
    }

    async fn run(&self, _state: StateSnapshot) -> Result<StatePatch, NodeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(NodeError::capability(std::io::Error::other(
                "scripted failure",
            )));
        }
        Ok(canned_patch(self.field))
    }
}

/// Two entry branches joined by a third node, with per-branch delays.
fn branching_graph(left_delay: Duration, right_delay: Duration) -> triage_graph::TaskGraph {
    let mut b = GraphBuilder::new();
    b.add_node(ScriptedNode::writer("left", StateField::Classification).delayed(left_delay))
        .unwrap();
    b.add_node(ScriptedNode::writer("right", StateField::Context).delayed(right_delay))
        .unwrap();
    b.add_node(ScriptedNode::writer("join", StateField::Answer))
        .unwrap();
    b.add_edge(START, "left").unwrap();
    b.add_edge(START, "right").unwrap();
    b.add_edge("left", "join").unwrap();
    b.add_edge("right", "join").unwrap();
    b.build().unwrap()
}

#[tokio::test]
async fn merged_state_is_identical_for_either_completion_order() {
    let executor = Executor::new();
    let left_first = branching_graph(Duration::ZERO, Duration::from_millis(40));
    let right_first = branching_graph(Duration::from_millis(40), Duration::ZERO);

    let a = executor
        .run(&left_first, GraphState::new("ticket"))
        .await
        .unwrap();
    let b = executor
        .run(&right_first, GraphState::new("ticket"))
        .await
        .unwrap();

    assert_eq!(a, b);
    assert!(a.classification().is_some());
    assert!(a.context().is_some());
    assert!(a.answer().is_some());
}

/// Both branches must be in flight at once: each waits on a barrier the other
/// must also reach. A sequential scheduler would deadlock and trip the outer
/// timeout.
#[tokio::test]
async fn independent_branches_run_concurrently() {
    struct BarrierNode {
        name: String,
        field: StateField,
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl GraphNode for BarrierNode {
        fn name(&self) -> &str {
            &self.name
        }

        fn writes(&self) -> &'static [StateField] {
            field_slice(self.field)
        }

        async fn run(&self, _state: StateSnapshot) -> Result<StatePatch, NodeError> {
            self.barrier.wait().await;
            Ok(canned_patch(self.field))
        }
    }

    let barrier = Arc::new(Barrier::new(2));
    let mut b = GraphBuilder::new();
    b.add_node(BarrierNode {
        name: "left".to_string(),
        field: StateField::Classification,
        barrier: barrier.clone(),
    })
    .unwrap();
    b.add_node(BarrierNode {
        name: "right".to_string(),
        field: StateField::Context,
        barrier,
    })
    .unwrap();
    b.add_edge(START, "left").unwrap();
    b.add_edge(START, "right").unwrap();
    let graph = b.build().unwrap();

    let executor = Executor::new();
    let state = tokio::time::timeout(
        Duration::from_secs(2),
        executor.run(&graph, GraphState::new("t")),
    )
    .await
    .expect("branches must overlap, not serialize")
    .unwrap();
    assert!(state.classification().is_some());
    assert!(state.context().is_some());
}

#[tokio::test]
async fn failure_aborts_run_and_keeps_completed_sibling_in_partial_state() {
    let mut b = GraphBuilder::new();
    b.add_node(ScriptedNode::writer("fast", StateField::Classification))
        .unwrap();
    b.add_node(
        ScriptedNode::writer("flaky", StateField::Context)
            .delayed(Duration::from_millis(80))
            .failing(),
    )
    .unwrap();
    b.add_node(ScriptedNode::writer("downstream", StateField::Answer))
        .unwrap();
    b.add_edge(START, "fast").unwrap();
    b.add_edge(START, "flaky").unwrap();
    b.add_edge("fast", "downstream").unwrap();
    b.add_edge("flaky", "downstream").unwrap();
    let graph = b.build().unwrap();

    let err = Executor::new()
        .run(&graph, GraphState::new("t"))
        .await
        .unwrap_err();

    assert_eq!(err.failed_node(), Some("flaky"));
    assert!(err.is_capability_failure());
    let partial = err.partial_state().expect("partial state attached");
    assert!(partial.classification().is_some(), "fast sibling was merged");
    assert!(
        partial.answer().is_none(),
        "downstream of the failure never ran"
    );
    assert!(err.to_string().contains("flaky"));
}

#[tokio::test]
async fn cancellation_interrupts_in_flight_nodes() {
    let mut b = GraphBuilder::new();
    b.add_node(
        ScriptedNode::writer("slow", StateField::Answer).delayed(Duration::from_secs(30)),
    )
    .unwrap();
    b.add_edge(START, "slow").unwrap();
    let graph = b.build().unwrap();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = Executor::new()
        .run_with_cancellation(&graph, GraphState::new("t"), &token)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::Cancelled));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "cancellation must not wait for the node"
    );
}

#[tokio::test]
async fn timed_out_node_fails_like_a_capability_error() {
    let mut b = GraphBuilder::new();
    b.add_node(
        ScriptedNode::writer("stuck", StateField::Answer).delayed(Duration::from_secs(30)),
    )
    .unwrap();
    b.add_edge(START, "stuck").unwrap();
    let graph = b.build().unwrap();

    let executor =
        Executor::with_config(ExecutorConfig::new().with_node_timeout(Duration::from_millis(50)));
    let started = Instant::now();
    let err = executor
        .run(&graph, GraphState::new("t"))
        .await
        .unwrap_err();

    assert_eq!(err.failed_node(), Some("stuck"));
    assert!(err.is_capability_failure());
    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn concurrency_limit_of_one_serializes_but_completes() {
    let graph = branching_graph(Duration::from_millis(10), Duration::from_millis(10));
    let executor =
        Executor::with_config(ExecutorConfig::new().with_max_concurrent_nodes(1));
    let state = executor.run(&graph, GraphState::new("t")).await.unwrap();
    assert_eq!(state.written_fields().len(), 3);
}

/// Construction-only node for property tests.
struct DummyNode {
    name: String,
}

#[async_trait]
impl GraphNode for DummyNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn writes(&self) -> &'static [StateField] {
        &[]
    }

    async fn run(&self, _state: StateSnapshot) -> Result<StatePatch, NodeError> {
        Ok(StatePatch::new())
    }
}

fn chain_builder(n: usize) -> GraphBuilder {
    let mut b = GraphBuilder::new();
    for i in 0..n {
        b.add_node(DummyNode {
            name: format!("n{i}"),
        })
        .unwrap();
    }
    b.add_edge(START, "n0").unwrap();
    for i in 1..n {
        b.add_edge(&format!("n{}", i - 1), &format!("n{i}")).unwrap();
    }
    b
}

proptest! {
    /// Any set of forward edges layered over a chain stays acyclic.
    #[test]
    fn forward_edges_always_validate(
        n in 2usize..8,
        extra in proptest::collection::vec((0usize..8, 0usize..8), 0..12),
    ) {
        let mut b = chain_builder(n);
        for (x, y) in extra {
            let (i, j) = (x % n, y % n);
            if i < j {
                // Duplicates of the chain edges are fine to skip.
                let _ = b.add_edge(&format!("n{i}"), &format!("n{j}"));
            }
        }
        prop_assert!(b.build().is_ok());
    }

    /// Any back edge over a chain closes a cycle and is rejected.
    #[test]
    fn back_edges_are_always_detected(
        n in 2usize..8,
        x in 0usize..8,
        y in 0usize..8,
    ) {
        let (i, j) = (x % n, y % n);
        prop_assume!(i < j);
        let mut b = chain_builder(n);
        b.add_edge(&format!("n{j}"), &format!("n{i}")).unwrap();
        prop_assert!(matches!(
            b.build(),
            Err(GraphDefinitionError::CycleDetected(_))
        ));
    }
}
