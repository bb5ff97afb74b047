//! The shared run state and its write-once merge discipline.
//!
//! [`GraphState`] is a plain struct with one exclusively-owned field per
//! producer node. Nodes return a [`StatePatch`] naming the fields they filled;
//! the executor merges patches one at a time, so merge is an additive union:
//! a second write to any field, or a write the node never declared, is a
//! [`StateError`] and aborts the run.
//!
//! Fields are private on purpose. The only writers are [`GraphState::new`]
//! (ticket text) and [`GraphState::merge`]; everything downstream reads.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_ticket::{Answer, Classification, ContextChunk, ResolutionDecision};

/// Names of the mergeable state fields, one per producer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateField {
    Classification,
    Context,
    Answer,
    Confidence,
    Resolution,
}

impl StateField {
    /// All mergeable fields.
    pub const ALL: [StateField; 5] = [
        StateField::Classification,
        StateField::Context,
        StateField::Answer,
        StateField::Confidence,
        StateField::Resolution,
    ];

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::Classification => "classification",
            StateField::Context => "context",
            StateField::Answer => "answer",
            StateField::Confidence => "confidence",
            StateField::Resolution => "resolution",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violation of the write-once merge discipline. Always a programming error
/// in a node or graph definition, never an expected runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("field '{field}' already written; node '{node}' attempted a second write")]
    DuplicateWrite { field: StateField, node: String },

    #[error("node '{node}' wrote field '{field}' it never declared")]
    UndeclaredWrite { field: StateField, node: String },
}

/// The accumulating merge target of one graph run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    ticket_text: String,
    classification: Option<Classification>,
    context: Option<Vec<ContextChunk>>,
    answer: Option<Answer>,
    confidence: Option<f64>,
    resolution: Option<ResolutionDecision>,
}

impl GraphState {
    /// Fresh state for one run, seeded with the canonical ticket text.
    #[inline]
    #[must_use]
    pub fn new(ticket_text: impl Into<String>) -> Self {
        Self {
            ticket_text: ticket_text.into(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn ticket_text(&self) -> &str {
        &self.ticket_text
    }

    #[inline]
    #[must_use]
    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<&[ContextChunk]> {
        self.context.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn answer(&self) -> Option<&Answer> {
        self.answer.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> Option<&ResolutionDecision> {
        self.resolution.as_ref()
    }

    /// Whether `field` has been written.
    #[must_use]
    pub fn is_set(&self, field: StateField) -> bool {
        match field {
            StateField::Classification => self.classification.is_some(),
            StateField::Context => self.context.is_some(),
            StateField::Answer => self.answer.is_some(),
            StateField::Confidence => self.confidence.is_some(),
            StateField::Resolution => self.resolution.is_some(),
        }
    }

    /// Fields written so far, in canonical order.
    #[must_use]
    pub fn written_fields(&self) -> Vec<StateField> {
        StateField::ALL
            .into_iter()
            .filter(|field| self.is_set(*field))
            .collect()
    }

    /// Merge one node's patch.
    ///
    /// Every field present in `patch` must appear in `declared` and must not
    /// already be set. On error the state is left unchanged.
    pub fn merge(
        &mut self,
        node: &str,
        declared: &[StateField],
        patch: StatePatch,
    ) -> Result<(), StateError> {
        for field in patch.fields() {
            if !declared.contains(&field) {
                return Err(StateError::UndeclaredWrite {
                    field,
                    node: node.to_string(),
                });
            }
            if self.is_set(field) {
                return Err(StateError::DuplicateWrite {
                    field,
                    node: node.to_string(),
                });
            }
        }

        if let Some(value) = patch.classification {
            self.classification = Some(value);
        }
        if let Some(value) = patch.context {
            self.context = Some(value);
        }
        if let Some(value) = patch.answer {
            self.answer = Some(value);
        }
        if let Some(value) = patch.confidence {
            self.confidence = Some(value);
        }
        if let Some(value) = patch.resolution {
            self.resolution = Some(value);
        }
        Ok(())
    }
}

/// The partial output of one node: the subset of fields it produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    classification: Option<Classification>,
    context: Option<Vec<ContextChunk>>,
    answer: Option<Answer>,
    confidence: Option<f64>,
    resolution: Option<ResolutionDecision>,
}

impl StatePatch {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_classification(mut self, value: Classification) -> Self {
        self.classification = Some(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_context(mut self, value: Vec<ContextChunk>) -> Self {
        self.context = Some(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_answer(mut self, value: Answer) -> Self {
        self.answer = Some(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_confidence(mut self, value: f64) -> Self {
        self.confidence = Some(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_resolution(mut self, value: ResolutionDecision) -> Self {
        self.resolution = Some(value);
        self
    }

    /// Fields carried by this patch, in canonical order.
    #[must_use]
    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        if self.classification.is_some() {
            fields.push(StateField::Classification);
        }
        if self.context.is_some() {
            fields.push(StateField::Context);
        }
        if self.answer.is_some() {
            fields.push(StateField::Answer);
        }
        if self.confidence.is_some() {
            fields.push(StateField::Confidence);
        }
        if self.resolution.is_some() {
            fields.push(StateField::Resolution);
        }
        fields
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_ticket::{Label, Priority};

    fn classification() -> Classification {
        Classification::new(vec![Label::Bug], "Frustrated", Priority::P1)
    }

    #[test]
    fn merge_fills_declared_fields() {
        let mut state = GraphState::new("ticket");
        let patch = StatePatch::new().with_classification(classification());
        state
            .merge("classify", &[StateField::Classification], patch)
            .expect("first write succeeds");
        assert!(state.is_set(StateField::Classification));
        assert_eq!(state.written_fields(), vec![StateField::Classification]);
    }

    #[test]
    fn merge_rejects_duplicate_write() {
        let mut state = GraphState::new("ticket");
        let declared = [StateField::Classification];
        state
            .merge(
                "classify",
                &declared,
                StatePatch::new().with_classification(classification()),
            )
            .unwrap();
        let err = state
            .merge(
                "rogue",
                &declared,
                StatePatch::new().with_classification(classification()),
            )
            .unwrap_err();
        assert_eq!(
            err,
            StateError::DuplicateWrite {
                field: StateField::Classification,
                node: "rogue".to_string(),
            }
        );
    }

    #[test]
    fn merge_rejects_undeclared_write() {
        let mut state = GraphState::new("ticket");
        let err = state
            .merge(
                "classify",
                &[StateField::Classification],
                StatePatch::new().with_confidence(0.9),
            )
            .unwrap_err();
        assert_eq!(
            err,
            StateError::UndeclaredWrite {
                field: StateField::Confidence,
                node: "classify".to_string(),
            }
        );
        // Rejected patches leave the state untouched.
        assert!(state.written_fields().is_empty());
    }

    #[test]
    fn failed_merge_is_atomic() {
        let mut state = GraphState::new("ticket");
        let declared = [StateField::Context, StateField::Answer];
        state
            .merge(
                "first",
                &declared,
                StatePatch::new().with_answer(Answer::new("a")),
            )
            .unwrap();
        // Second patch carries one mergeable and one duplicate field.
        let err = state
            .merge(
                "second",
                &declared,
                StatePatch::new()
                    .with_context(vec![ContextChunk::new("c")])
                    .with_answer(Answer::new("b")),
            )
            .unwrap_err();
        assert!(matches!(err, StateError::DuplicateWrite { .. }));
        assert!(!state.is_set(StateField::Context));
    }

    #[test]
    fn patch_reports_its_fields_in_order() {
        let patch = StatePatch::new()
            .with_confidence(0.5)
            .with_context(vec![ContextChunk::new("c")]);
        assert_eq!(
            patch.fields(),
            vec![StateField::Context, StateField::Confidence]
        );
        assert!(!patch.is_empty());
        assert!(StatePatch::new().is_empty());
    }

    #[test]
    fn state_serializes_written_fields() {
        let mut state = GraphState::new("ticket");
        state
            .merge(
                "evaluate_confidence",
                &[StateField::Confidence],
                StatePatch::new().with_confidence(0.75),
            )
            .unwrap();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["confidence"], 0.75);
        assert_eq!(json["ticket_text"], "ticket");
    }
}
