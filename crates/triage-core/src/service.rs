//! High-level triage entry points.
//!
//! [`TriageService`] owns the compiled graphs and the executor; callers
//! (the CLI here, an HTTP layer elsewhere) hand it raw ticket text and get
//! a typed outcome or a single terminal error. Graph construction happens
//! once in [`TriageService::new`], so a malformed wiring can never surface
//! at request time.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use triage_capability::Capabilities;
use triage_graph::{Executor, GraphState, TaskGraph};
use triage_ticket::{Classification, ResolutionDecision};

use crate::config::TriageConfig;
use crate::error::{TriageError, ValidationError};
use crate::pipeline;

/// Result of a classify-only run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyOutcome {
    pub classification: Classification,
}

/// Result of a full triage run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveOutcome {
    pub classification: Classification,
    pub decision: ResolutionDecision,
}

impl ResolveOutcome {
    #[inline]
    #[must_use]
    pub fn final_response(&self) -> Option<&str> {
        self.decision.final_response.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.decision.confidence
    }

    #[inline]
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.decision.sources
    }
}

pub struct TriageService {
    executor: Executor,
    full_graph: TaskGraph,
    classify_graph: TaskGraph,
}

impl TriageService {
    pub fn new(config: &TriageConfig, caps: &Capabilities) -> Result<Self, TriageError> {
        Ok(Self {
            executor: Executor::with_config(config.executor_config()),
            full_graph: pipeline::triage_graph(caps)?,
            classify_graph: pipeline::classify_graph(caps)?,
        })
    }

    fn validated(ticket_text: &str) -> Result<String, ValidationError> {
        let trimmed = ticket_text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTicketText);
        }
        Ok(trimmed.to_string())
    }

    /// Run only the classify node.
    pub async fn classify_only(&self, ticket_text: &str) -> Result<ClassifyOutcome, TriageError> {
        self.classify_only_with_cancellation(ticket_text, &CancellationToken::new())
            .await
    }

    pub async fn classify_only_with_cancellation(
        &self,
        ticket_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassifyOutcome, TriageError> {
        let text = Self::validated(ticket_text)?;
        let state = self
            .executor
            .run_with_cancellation(&self.classify_graph, GraphState::new(text), cancel)
            .await?;
        let classification = state.classification().cloned().ok_or_else(|| {
            TriageError::Internal("classify run completed without a classification".to_string())
        })?;
        Ok(ClassifyOutcome { classification })
    }

    /// Run the full graph: classify and retrieve in parallel, then
    /// generate, score, and decide.
    pub async fn resolve_ticket(&self, ticket_text: &str) -> Result<ResolveOutcome, TriageError> {
        self.resolve_ticket_with_cancellation(ticket_text, &CancellationToken::new())
            .await
    }

    pub async fn resolve_ticket_with_cancellation(
        &self,
        ticket_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolveOutcome, TriageError> {
        let text = Self::validated(ticket_text)?;
        let state = self
            .executor
            .run_with_cancellation(&self.full_graph, GraphState::new(text), cancel)
            .await?;
        let classification = state.classification().cloned().ok_or_else(|| {
            TriageError::Internal("triage run completed without a classification".to_string())
        })?;
        let decision = state.resolution().cloned().ok_or_else(|| {
            TriageError::Internal("triage run completed without a resolution".to_string())
        })?;
        info!(
            needs_rag = decision.needs_rag,
            team = %decision.routing_team,
            confidence = decision.confidence,
            queued = decision.queue_for_review,
            "ticket resolved"
        );
        Ok(ResolveOutcome {
            classification,
            decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use triage_capability::MemoryIndex;

    fn offline_service() -> TriageService {
        let caps = Capabilities::offline(Arc::new(MemoryIndex::default()));
        TriageService::new(&TriageConfig::default(), &caps).unwrap()
    }

    #[tokio::test]
    async fn blank_tickets_are_rejected_before_execution() {
        let service = offline_service();
        let err = service.resolve_ticket("   \n  ").await.unwrap_err();
        assert!(matches!(
            err,
            TriageError::Validation(ValidationError::EmptyTicketText)
        ));
        let err = service.classify_only("").await.unwrap_err();
        assert!(matches!(
            err,
            TriageError::Validation(ValidationError::EmptyTicketText)
        ));
    }

    #[tokio::test]
    async fn classify_only_returns_a_classification() {
        let service = offline_service();
        let outcome = service
            .classify_only("How do I configure the Snowflake connector?")
            .await
            .unwrap();
        assert!(!outcome.classification.labels.is_empty());
    }

    #[tokio::test]
    async fn resolve_with_empty_index_escalates_on_low_confidence() {
        let service = offline_service();
        let outcome = service
            .resolve_ticket("How do I configure the Snowflake connector?")
            .await
            .unwrap();
        // Nothing indexed, so the heuristic answer is ungrounded.
        assert!(outcome.decision.needs_rag);
        assert_eq!(outcome.final_response(), None);
        assert!(outcome.confidence() < 0.4);
    }

    #[tokio::test]
    async fn outcome_accessors_mirror_the_decision() {
        let service = offline_service();
        let outcome = service.resolve_ticket("The dashboard is broken").await.unwrap();
        assert_eq!(outcome.confidence(), outcome.decision.confidence);
        assert_eq!(
            outcome.final_response().map(str::to_string),
            outcome.decision.final_response
        );
    }
}
