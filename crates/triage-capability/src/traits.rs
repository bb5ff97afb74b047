//! The four capability seams the graph nodes call through.
//!
//! Each trait is one opaque, possibly slow, possibly failing operation.
//! Implementations must be side-effect free from the caller's perspective
//! and safe to invoke more than once per ticket. Timeouts are imposed by the
//! executor, not here.

use std::sync::Arc;

use async_trait::async_trait;
use triage_ticket::{Answer, Classification, ContextChunk};

use crate::error::CapabilityError;
use crate::heuristic::HeuristicTriage;
use crate::memory_index::MemoryIndex;

/// Classify ticket text against the closed vocabulary.
#[async_trait]
pub trait TicketClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, CapabilityError>;
}

/// Retrieve grounding context for ticket text, best match first.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, text: &str) -> Result<Vec<ContextChunk>, CapabilityError>;
}

/// Generate an answer from ticket text plus retrieved context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        context: &[ContextChunk],
    ) -> Result<Answer, CapabilityError>;
}

/// Score an answer's trustworthiness. Implementations must return a value
/// in `[0, 1]`.
#[async_trait]
pub trait ConfidenceScorer: Send + Sync {
    async fn score_confidence(
        &self,
        text: &str,
        context: &[ContextChunk],
        answer: &Answer,
    ) -> Result<f64, CapabilityError>;
}

/// The full adapter bundle a pipeline is wired with. Plain dependency
/// injection: construct it once, hand it to the graph wiring.
#[derive(Clone)]
pub struct Capabilities {
    pub classifier: Arc<dyn TicketClassifier>,
    pub retriever: Arc<dyn ContextRetriever>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub scorer: Arc<dyn ConfidenceScorer>,
}

impl Capabilities {
    #[inline]
    #[must_use]
    pub fn new(
        classifier: Arc<dyn TicketClassifier>,
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<dyn AnswerGenerator>,
        scorer: Arc<dyn ConfidenceScorer>,
    ) -> Self {
        Self {
            classifier,
            retriever,
            generator,
            scorer,
        }
    }

    /// Fully offline bundle: heuristic classification, generation, and
    /// scoring over the given in-memory index.
    #[must_use]
    pub fn offline(index: Arc<MemoryIndex>) -> Self {
        let heuristic = Arc::new(HeuristicTriage::new());
        Self {
            classifier: heuristic.clone(),
            retriever: index,
            generator: heuristic.clone(),
            scorer: heuristic,
        }
    }
}
