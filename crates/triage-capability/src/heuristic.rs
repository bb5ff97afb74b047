//! Keyword-driven triage capabilities.
//!
//! Deterministic, dependency-free implementations of classification, answer
//! generation, and confidence scoring. They exist for offline runs and for
//! tests that need stable outputs; quality-wise they are a floor, not a goal.

use async_trait::async_trait;
use triage_ticket::{Answer, Classification, ContextChunk, Label, Priority};

use crate::error::CapabilityError;
use crate::memory_index::tokenize;
use crate::traits::{AnswerGenerator, ConfidenceScorer, TicketClassifier};

/// Marker phrases per label, checked in canonical vocabulary order.
/// Single words match whole tokens; phrases match as substrings.
const LABEL_RULES: &[(Label, &[&str])] = &[
    (Label::HowTo, &["how do i", "how to", "how can i", "steps to"]),
    (Label::Product, &["product", "feature", "dashboard", "workflow"]),
    (Label::Connector, &["connector", "integration", "ingest", "sync"]),
    (Label::Lineage, &["lineage", "upstream", "downstream"]),
    (Label::ApiSdk, &["api", "sdk", "endpoint", "webhook"]),
    (Label::Sso, &["sso", "saml", "okta", "single sign-on"]),
    (Label::Glossary, &["glossary", "definition", "terminology"]),
    (Label::BestPractices, &["best practice", "best practices", "recommend", "convention"]),
    (Label::SensitiveData, &["sensitive", "pii", "gdpr", "masking"]),
    (Label::Bug, &["bug", "error", "crash", "broken", "fails", "failing"]),
    (Label::Permissions, &["permission", "permissions", "access denied", "role", "forbidden"]),
];

const ANGRY_MARKERS: &[&str] = &["angry", "furious", "unacceptable", "ridiculous", "!!!"];
const FRUSTRATED_MARKERS: &[&str] = &["frustrated", "frustrating", "annoying", "still not working"];
const CURIOUS_MARKERS: &[&str] = &["curious", "wondering", "interested in", "exploring"];

const URGENT_MARKERS: &[&str] = &["urgent", "asap", "immediately", "production down", "outage"];
const BLOCKING_MARKERS: &[&str] = &["blocked", "blocker", "critical", "cannot work"];
const MINOR_MARKERS: &[&str] = &["minor", "low priority", "whenever", "nice to have"];

const FALLBACK_ANSWER: &str = "I could not find documentation relevant to this request.";
const EXCERPT_CHARS: usize = 240;

fn matches_marker(lowered: &str, tokens: &[String], marker: &str) -> bool {
    if marker.contains(' ') || marker.chars().any(|c| !c.is_ascii_alphanumeric()) {
        lowered.contains(marker)
    } else {
        tokens.iter().any(|token| token == marker)
    }
}

fn any_marker(lowered: &str, tokens: &[String], markers: &[&str]) -> bool {
    markers
        .iter()
        .any(|marker| matches_marker(lowered, tokens, marker))
}

/// Stateless ruleset shared across the classifier, generator, and scorer
/// seams by the offline capability bundle.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTriage;

impl HeuristicTriage {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn labels(lowered: &str, tokens: &[String]) -> Vec<Label> {
        LABEL_RULES
            .iter()
            .filter(|(_, markers)| any_marker(lowered, tokens, markers))
            .map(|(label, _)| *label)
            .collect()
    }

    fn sentiment(lowered: &str, tokens: &[String]) -> String {
        if any_marker(lowered, tokens, ANGRY_MARKERS) {
            "Angry"
        } else if any_marker(lowered, tokens, FRUSTRATED_MARKERS) {
            "Frustrated"
        } else if any_marker(lowered, tokens, CURIOUS_MARKERS) {
            "Curious"
        } else {
            "Neutral"
        }
        .to_string()
    }

    fn priority(lowered: &str, tokens: &[String]) -> Priority {
        if any_marker(lowered, tokens, URGENT_MARKERS) {
            Priority::P0
        } else if any_marker(lowered, tokens, BLOCKING_MARKERS) {
            Priority::P1
        } else if any_marker(lowered, tokens, MINOR_MARKERS) {
            Priority::P3
        } else {
            Priority::P2
        }
    }
}

#[async_trait]
impl TicketClassifier for HeuristicTriage {
    async fn classify(&self, text: &str) -> Result<Classification, CapabilityError> {
        let lowered = text.to_lowercase();
        let tokens = tokenize(text);
        Ok(Classification::new(
            Self::labels(&lowered, &tokens),
            Self::sentiment(&lowered, &tokens),
            Self::priority(&lowered, &tokens),
        ))
    }
}

#[async_trait]
impl AnswerGenerator for HeuristicTriage {
    async fn generate(
        &self,
        _text: &str,
        context: &[ContextChunk],
    ) -> Result<Answer, CapabilityError> {
        let Some(chunk) = context.iter().find(|chunk| !chunk.content.trim().is_empty()) else {
            return Ok(Answer::new(FALLBACK_ANSWER));
        };
        let excerpt: String = chunk.content.trim().chars().take(EXCERPT_CHARS).collect();
        Ok(Answer::new(format!("Based on the documentation: {excerpt}")))
    }
}

#[async_trait]
impl ConfidenceScorer for HeuristicTriage {
    /// Fraction of unique answer terms that also appear in the retrieved
    /// context. The fallback answer shares nothing with an empty context and
    /// scores 0.0.
    async fn score_confidence(
        &self,
        _text: &str,
        context: &[ContextChunk],
        answer: &Answer,
    ) -> Result<f64, CapabilityError> {
        let answer_terms: std::collections::BTreeSet<String> =
            tokenize(&answer.text).into_iter().collect();
        if answer_terms.is_empty() {
            return Ok(0.0);
        }
        let context_terms: std::collections::BTreeSet<String> = context
            .iter()
            .flat_map(|chunk| tokenize(&chunk.content))
            .collect();
        let overlap = answer_terms
            .iter()
            .filter(|term| context_terms.contains(*term))
            .count() as f64;
        Ok((overlap / answer_terms.len() as f64).clamp(0.0, 1.0))
    }
}
