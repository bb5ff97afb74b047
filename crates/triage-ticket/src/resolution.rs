//! The routing decision produced for every resolved ticket.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The human team a non-auto-resolved ticket is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingTeam {
    Engineering,
    Security,
    #[serde(rename = "Data Engineering")]
    DataEngineering,
    #[serde(rename = "General Support")]
    GeneralSupport,
}

impl RoutingTeam {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingTeam::Engineering => "Engineering",
            RoutingTeam::Security => "Security",
            RoutingTeam::DataEngineering => "Data Engineering",
            RoutingTeam::GeneralSupport => "General Support",
        }
    }
}

impl fmt::Display for RoutingTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the resolution router. Derived per request, never persisted.
///
/// `final_response` is `None` exactly when the ticket is escalated
/// (low-confidence RAG branch); `queue_for_review` is the side channel the
/// external review-queue dispatcher acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionDecision {
    pub needs_rag: bool,
    pub routing_team: RoutingTeam,
    pub final_response: Option<String>,
    pub confidence: f64,
    pub reason: String,
    pub queue_for_review: bool,
    pub sources: Vec<String>,
}
