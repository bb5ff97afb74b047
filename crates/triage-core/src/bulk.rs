//! Bulk classification with streamed progress.
//!
//! Tickets are classified one at a time; each outcome is pushed onto an
//! mpsc channel as it lands so a consumer can render progress live. One
//! bad ticket never aborts the batch. A dropped receiver or a cancelled
//! token stops the remaining work.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use triage_graph::ExecutionError;
use triage_ticket::{Classification, Ticket};

use crate::error::TriageError;
use crate::service::TriageService;

/// Progress of a bulk run, in emission order: one `Started`, one event per
/// attempted ticket, one `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BulkEvent {
    Started {
        total: usize,
    },
    Classified {
        ticket_id: String,
        index: usize,
        classification: Classification,
    },
    Failed {
        ticket_id: String,
        index: usize,
        error: String,
    },
    Completed {
        summary: BulkSummary,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct BulkClassifier<'a> {
    service: &'a TriageService,
}

impl<'a> BulkClassifier<'a> {
    #[must_use]
    pub fn new(service: &'a TriageService) -> Self {
        Self { service }
    }

    pub async fn run(&self, tickets: &[Ticket], events: mpsc::Sender<BulkEvent>) -> BulkSummary {
        self.run_with_cancellation(tickets, events, &CancellationToken::new())
            .await
    }

    pub async fn run_with_cancellation(
        &self,
        tickets: &[Ticket],
        events: mpsc::Sender<BulkEvent>,
        cancel: &CancellationToken,
    ) -> BulkSummary {
        let mut summary = BulkSummary {
            total: tickets.len(),
            ..BulkSummary::default()
        };
        if events
            .send(BulkEvent::Started { total: summary.total })
            .await
            .is_err()
        {
            return summary;
        }

        for (index, ticket) in tickets.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let ticket_id = ticket.display_id(index);
            let event = match self
                .service
                .classify_only_with_cancellation(&ticket.text(), cancel)
                .await
            {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    BulkEvent::Classified {
                        ticket_id,
                        index,
                        classification: outcome.classification,
                    }
                }
                Err(TriageError::Execution(ExecutionError::Cancelled)) => break,
                Err(err) => {
                    summary.failed += 1;
                    warn!(%ticket_id, error = %err, "bulk classification failed");
                    BulkEvent::Failed {
                        ticket_id,
                        index,
                        error: err.to_string(),
                    }
                }
            };
            if events.send(event).await.is_err() {
                return summary;
            }
        }

        let _ = events.send(BulkEvent::Completed { summary }).await;
        summary
    }
}
