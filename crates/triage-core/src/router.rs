//! Resolution routing policy.
//!
//! A pure function from (classification, confidence, context, answer) to a
//! [`ResolutionDecision`]. Everything here is deterministic string and set
//! logic; no I/O, no clocks, no randomness. The thresholds and templates are
//! part of the product contract with the downstream queue dispatcher, so
//! changing any constant is a behavioural change, not a refactor.

use triage_ticket::{Answer, Classification, ContextChunk, Label, ResolutionDecision, RoutingTeam};

/// Confidence at or above which the generated answer ships as-is.
pub const HIGH_CONFIDENCE: f64 = 0.75;
/// Confidence at or above which a draft ships with a review flag; below it
/// the ticket escalates to a human team.
pub const REVIEW_CONFIDENCE: f64 = 0.4;
/// Cap on source identifiers rendered under an answer.
pub const MAX_SOURCES: usize = 5;

/// Labels that warrant a knowledge-base answer instead of plain routing.
pub const RAG_LABELS: [Label; 5] = [
    Label::HowTo,
    Label::Product,
    Label::BestPractices,
    Label::ApiSdk,
    Label::Sso,
];

/// Prefix for draft answers awaiting human review.
pub const REVIEW_PREAMBLE: &str =
    "Thanks for reaching out! Here is a draft answer while a support specialist double-checks it:\n\n";

const REASON_HIGH: &str = "High confidence RAG answer.";
const REASON_REVIEW: &str = "Medium confidence; queued for human review.";
const REASON_ROUTED: &str = "Routed by label rules; no knowledge base lookup required.";

/// True when any label calls for a retrieval-grounded answer.
#[must_use]
pub fn needs_rag(classification: &Classification) -> bool {
    classification
        .labels
        .iter()
        .any(|label| RAG_LABELS.contains(label))
}

/// Owning team by first matching rule. Bug outranks the security labels,
/// which outrank the data-platform labels.
#[must_use]
pub fn routing_team(classification: &Classification) -> RoutingTeam {
    let has = |label: Label| classification.has_label(label);
    if has(Label::Bug) {
        RoutingTeam::Engineering
    } else if has(Label::Permissions) || has(Label::Sso) {
        RoutingTeam::Security
    } else if has(Label::Connector) || has(Label::Lineage) {
        RoutingTeam::DataEngineering
    } else {
        RoutingTeam::GeneralSupport
    }
}

/// Distinct non-empty source identifiers in retrieval order, capped at
/// [`MAX_SOURCES`].
#[must_use]
pub fn source_identifiers(context: &[ContextChunk]) -> Vec<String> {
    let mut identifiers: Vec<String> = Vec::new();
    for chunk in context {
        let Some(source) = chunk.source.as_deref() else {
            continue;
        };
        let trimmed = source.trim();
        if trimmed.is_empty() || identifiers.iter().any(|seen| seen == trimmed) {
            continue;
        }
        identifiers.push(trimmed.to_string());
        if identifiers.len() == MAX_SOURCES {
            break;
        }
    }
    identifiers
}

fn sources_block(sources: &[String]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut block = String::from("\n\nSources:");
    for source in sources {
        block.push_str("\n- ");
        block.push_str(source);
    }
    block
}

/// Decide what happens to a ticket.
///
/// The routing team is computed from the label rules in every branch,
/// including low confidence, so escalations land with the team the labels
/// point at rather than a catch-all queue.
#[must_use]
pub fn resolve(
    classification: &Classification,
    confidence: f64,
    context: &[ContextChunk],
    answer: &Answer,
) -> ResolutionDecision {
    let team = routing_team(classification);

    if !needs_rag(classification) {
        let first_label = classification.labels.first().map_or("General", Label::as_str);
        return ResolutionDecision {
            needs_rag: false,
            routing_team: team,
            final_response: Some(format!(
                "This ticket has been classified as a '{first_label}' issue and routed to the {team} team."
            )),
            confidence,
            reason: REASON_ROUTED.to_string(),
            queue_for_review: false,
            sources: Vec::new(),
        };
    }

    let sources = source_identifiers(context);
    let block = sources_block(&sources);

    if confidence >= HIGH_CONFIDENCE {
        ResolutionDecision {
            needs_rag: true,
            routing_team: team,
            final_response: Some(format!("{}{block}", answer.text)),
            confidence,
            reason: REASON_HIGH.to_string(),
            queue_for_review: false,
            sources,
        }
    } else if confidence >= REVIEW_CONFIDENCE {
        ResolutionDecision {
            needs_rag: true,
            routing_team: team,
            final_response: Some(format!("{REVIEW_PREAMBLE}{}{block}", answer.text)),
            confidence,
            reason: REASON_REVIEW.to_string(),
            queue_for_review: true,
            sources,
        }
    } else {
        ResolutionDecision {
            needs_rag: true,
            routing_team: team,
            final_response: None,
            confidence,
            reason: format!("Low confidence; escalated to {team} team."),
            queue_for_review: false,
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use triage_ticket::Priority;

    fn classified(labels: Vec<Label>) -> Classification {
        Classification::new(labels, "Neutral", Priority::P2)
    }

    fn chunk(source: &str) -> ContextChunk {
        ContextChunk::new("body").with_source(source)
    }

    #[test]
    fn bug_outranks_sso_for_routing() {
        let team = routing_team(&classified(vec![Label::Bug, Label::Sso]));
        assert_eq!(team, RoutingTeam::Engineering);
    }

    #[test]
    fn permissions_routes_to_security_and_lineage_to_data_engineering() {
        assert_eq!(
            routing_team(&classified(vec![Label::Permissions])),
            RoutingTeam::Security
        );
        assert_eq!(
            routing_team(&classified(vec![Label::Lineage])),
            RoutingTeam::DataEngineering
        );
        assert_eq!(
            routing_team(&classified(vec![Label::Glossary])),
            RoutingTeam::GeneralSupport
        );
    }

    #[test]
    fn high_confidence_ships_answer_with_sources() {
        let decision = resolve(
            &classified(vec![Label::HowTo]),
            0.9,
            &[chunk("docs/connect")],
            &Answer::new("Use the connector wizard."),
        );
        assert!(decision.needs_rag);
        assert_eq!(
            decision.final_response.as_deref(),
            Some("Use the connector wizard.\n\nSources:\n- docs/connect")
        );
        assert_eq!(decision.reason, "High confidence RAG answer.");
        assert!(!decision.queue_for_review);
        assert_eq!(decision.sources, vec!["docs/connect".to_string()]);
    }

    #[test]
    fn thresholds_are_inclusive_at_both_boundaries() {
        let classification = classified(vec![Label::HowTo]);
        let answer = Answer::new("a");

        let high = resolve(&classification, 0.75, &[], &answer);
        assert_eq!(high.reason, "High confidence RAG answer.");

        let medium = resolve(&classification, 0.4, &[], &answer);
        assert_eq!(medium.reason, "Medium confidence; queued for human review.");
        assert!(medium.queue_for_review);

        let low = resolve(&classification, 0.3999, &[], &answer);
        assert_eq!(low.final_response, None);
        assert!(low.reason.starts_with("Low confidence"));
    }

    #[test]
    fn medium_confidence_prepends_the_review_preamble() {
        let decision = resolve(
            &classified(vec![Label::Product]),
            0.5,
            &[chunk("docs/a")],
            &Answer::new("Draft body."),
        );
        let response = decision.final_response.unwrap();
        assert!(response.starts_with(REVIEW_PREAMBLE));
        assert!(response.ends_with("Draft body.\n\nSources:\n- docs/a"));
        assert!(decision.queue_for_review);
    }

    #[test]
    fn low_confidence_escalates_to_the_label_team() {
        let decision = resolve(
            &classified(vec![Label::Sso]),
            0.1,
            &[],
            &Answer::new("unused"),
        );
        assert_eq!(decision.final_response, None);
        assert_eq!(decision.reason, "Low confidence; escalated to Security team.");
        assert_eq!(decision.routing_team, RoutingTeam::Security);
    }

    #[test]
    fn no_rag_labels_route_with_the_template() {
        let decision = resolve(&classified(vec![Label::Bug]), 0.9, &[], &Answer::new("unused"));
        assert!(!decision.needs_rag);
        assert_eq!(
            decision.final_response.as_deref(),
            Some("This ticket has been classified as a 'Bug' issue and routed to the Engineering team.")
        );
        assert!(decision.sources.is_empty());
    }

    #[test]
    fn empty_labels_fall_back_to_general() {
        let decision = resolve(&classified(vec![]), 0.9, &[], &Answer::new("unused"));
        assert_eq!(
            decision.final_response.as_deref(),
            Some("This ticket has been classified as a 'General' issue and routed to the General Support team.")
        );
    }

    #[test]
    fn sources_dedupe_preserve_order_and_cap_at_five() {
        let context: Vec<ContextChunk> = vec![
            chunk("a"),
            chunk("b"),
            chunk("a"),
            ContextChunk::new("no source"),
            chunk("  "),
            chunk("c"),
            chunk("d"),
            chunk("e"),
            chunk("f"),
            chunk("g"),
        ];
        let identifiers = source_identifiers(&context);
        assert_eq!(identifiers, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn answer_without_sources_has_no_sources_block() {
        let decision = resolve(
            &classified(vec![Label::HowTo]),
            0.9,
            &[ContextChunk::new("anonymous context")],
            &Answer::new("Answer."),
        );
        assert_eq!(decision.final_response.as_deref(), Some("Answer."));
    }

    #[test]
    fn sso_is_both_a_rag_label_and_a_security_label() {
        let classification = classified(vec![Label::Sso]);
        assert!(needs_rag(&classification));
        assert_eq!(routing_team(&classification), RoutingTeam::Security);
    }
}
