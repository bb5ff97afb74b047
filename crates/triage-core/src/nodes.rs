//! The five triage nodes.
//!
//! Each node is pure glue: read declared inputs from the state snapshot,
//! make exactly one capability call, return the result as a patch. Retries,
//! timeouts, and logging belong to the executor and the adapters, never
//! here.

use std::sync::Arc;

use async_trait::async_trait;
use triage_capability::{AnswerGenerator, ConfidenceScorer, ContextRetriever, TicketClassifier};
use triage_graph::{GraphNode, NodeError, StateField, StatePatch, StateSnapshot};

use crate::router;

/// Node names as they appear in graph wiring, logs, and failure reports.
pub mod node_name {
    pub const CLASSIFY: &str = "classify";
    pub const RETRIEVE: &str = "retrieve";
    pub const GENERATE: &str = "generate";
    pub const EVALUATE_CONFIDENCE: &str = "evaluate_confidence";
    pub const RESOLVE_AND_FORMAT: &str = "resolve_and_format";
}

pub struct ClassifyNode {
    classifier: Arc<dyn TicketClassifier>,
}

impl ClassifyNode {
    #[must_use]
    pub fn new(classifier: Arc<dyn TicketClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl GraphNode for ClassifyNode {
    fn name(&self) -> &str {
        node_name::CLASSIFY
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Classification]
    }

    async fn run(&self, state: StateSnapshot) -> Result<StatePatch, NodeError> {
        let classification = self
            .classifier
            .classify(state.ticket_text())
            .await
            .map_err(NodeError::capability)?;
        Ok(StatePatch::new().with_classification(classification))
    }
}

pub struct RetrieveNode {
    retriever: Arc<dyn ContextRetriever>,
}

impl RetrieveNode {
    #[must_use]
    pub fn new(retriever: Arc<dyn ContextRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl GraphNode for RetrieveNode {
    fn name(&self) -> &str {
        node_name::RETRIEVE
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Context]
    }

    async fn run(&self, state: StateSnapshot) -> Result<StatePatch, NodeError> {
        let context = self
            .retriever
            .retrieve(state.ticket_text())
            .await
            .map_err(NodeError::capability)?;
        Ok(StatePatch::new().with_context(context))
    }
}

/// Waits on both entry branches but reads only the retrieved context; the
/// edge from classification is ordering, not data.
pub struct GenerateNode {
    generator: Arc<dyn AnswerGenerator>,
}

impl GenerateNode {
    #[must_use]
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl GraphNode for GenerateNode {
    fn name(&self) -> &str {
        node_name::GENERATE
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Answer]
    }

    async fn run(&self, state: StateSnapshot) -> Result<StatePatch, NodeError> {
        let context = state
            .context()
            .ok_or(NodeError::MissingInput(StateField::Context))?;
        let answer = self
            .generator
            .generate(state.ticket_text(), context)
            .await
            .map_err(NodeError::capability)?;
        Ok(StatePatch::new().with_answer(answer))
    }
}

pub struct EvaluateConfidenceNode {
    scorer: Arc<dyn ConfidenceScorer>,
}

impl EvaluateConfidenceNode {
    #[must_use]
    pub fn new(scorer: Arc<dyn ConfidenceScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl GraphNode for EvaluateConfidenceNode {
    fn name(&self) -> &str {
        node_name::EVALUATE_CONFIDENCE
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Confidence]
    }

    async fn run(&self, state: StateSnapshot) -> Result<StatePatch, NodeError> {
        let context = state
            .context()
            .ok_or(NodeError::MissingInput(StateField::Context))?;
        let answer = state
            .answer()
            .ok_or(NodeError::MissingInput(StateField::Answer))?;
        let raw = self
            .scorer
            .score_confidence(state.ticket_text(), context, answer)
            .await
            .map_err(NodeError::capability)?;
        // Scorers are untrusted: out-of-range values clamp, NaN counts as
        // no confidence.
        let confidence = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
        Ok(StatePatch::new().with_confidence(confidence))
    }
}

/// Terminal node. Applies the routing policy; the only node with no
/// capability behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveAndFormatNode;

#[async_trait]
impl GraphNode for ResolveAndFormatNode {
    fn name(&self) -> &str {
        node_name::RESOLVE_AND_FORMAT
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Resolution]
    }

    async fn run(&self, state: StateSnapshot) -> Result<StatePatch, NodeError> {
        let classification = state
            .classification()
            .ok_or(NodeError::MissingInput(StateField::Classification))?;
        let confidence = state
            .confidence()
            .ok_or(NodeError::MissingInput(StateField::Confidence))?;
        let context = state
            .context()
            .ok_or(NodeError::MissingInput(StateField::Context))?;
        let answer = state
            .answer()
            .ok_or(NodeError::MissingInput(StateField::Answer))?;

        let decision = router::resolve(classification, confidence, context, answer);
        Ok(StatePatch::new().with_resolution(decision))
    }
}
