//! Classification run reports.
//!
//! Aggregates a batch of classification outcomes into label, priority, and
//! sentiment distributions with timing. The builder is fed once per ticket;
//! [`ReportBuilder::finish`] freezes the totals.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use triage_ticket::Classification;

#[derive(Debug, Default)]
pub struct ReportBuilder {
    succeeded: usize,
    failed: usize,
    label_counts: BTreeMap<String, usize>,
    priority_counts: BTreeMap<String, usize>,
    sentiment_counts: BTreeMap<String, usize>,
    total_latency: Duration,
}

impl ReportBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, classification: &Classification, latency: Duration) {
        self.succeeded += 1;
        self.total_latency += latency;
        for label in &classification.labels {
            *self
                .label_counts
                .entry(label.as_str().to_string())
                .or_insert(0) += 1;
        }
        *self
            .priority_counts
            .entry(classification.priority.as_str().to_string())
            .or_insert(0) += 1;
        *self
            .sentiment_counts
            .entry(classification.sentiment.clone())
            .or_insert(0) += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    #[must_use]
    pub fn finish(self) -> TriageReport {
        let total = self.succeeded + self.failed;
        let success_rate = if total == 0 {
            0.0
        } else {
            self.succeeded as f64 / total as f64 * 100.0
        };
        let avg_latency_ms = if self.succeeded == 0 {
            0.0
        } else {
            self.total_latency.as_secs_f64() * 1000.0 / self.succeeded as f64
        };
        TriageReport {
            generated_at: Utc::now(),
            total,
            succeeded: self.succeeded,
            failed: self.failed,
            success_rate,
            avg_latency_ms,
            label_counts: self.label_counts,
            priority_counts: self.priority_counts,
            sentiment_counts: self.sentiment_counts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Percentage in `[0, 100]`.
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub label_counts: BTreeMap<String, usize>,
    pub priority_counts: BTreeMap<String, usize>,
    pub sentiment_counts: BTreeMap<String, usize>,
}

fn write_counts(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    counts: &BTreeMap<String, usize>,
) -> fmt::Result {
    writeln!(f, "{heading}:")?;
    if counts.is_empty() {
        writeln!(f, "  (none)")?;
    }
    for (key, count) in counts {
        writeln!(f, "  {key}: {count}")?;
    }
    Ok(())
}

impl fmt::Display for TriageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ticket Classification Report")?;
        writeln!(f, "============================")?;
        writeln!(f)?;
        writeln!(f, "Generated: {}", self.generated_at.to_rfc3339())?;
        writeln!(
            f,
            "Tickets: {} ({} succeeded, {} failed, {:.1}% success)",
            self.total, self.succeeded, self.failed, self.success_rate
        )?;
        writeln!(f, "Avg classification latency: {:.1} ms", self.avg_latency_ms)?;
        writeln!(f)?;
        write_counts(f, "Labels", &self.label_counts)?;
        writeln!(f)?;
        write_counts(f, "Priorities", &self.priority_counts)?;
        writeln!(f)?;
        write_counts(f, "Sentiments", &self.sentiment_counts)
    }
}
