//! Support-ticket triage orchestration.
//!
//! Wires the task-graph engine, the domain types, and the capability
//! adapters into the two operations callers use:
//!
//! - [`TriageService::classify_only`]: run just the classify node, for
//!   cheap bulk classification.
//! - [`TriageService::resolve_ticket`]: run the full graph (classify and
//!   retrieve in parallel, then generate, score, and decide) and return a
//!   [`triage_ticket::ResolutionDecision`].
//!
//! Around those sit the deterministic routing policy ([`router`]), bulk
//! streaming ([`bulk`]), ticket loading ([`loader`]), run reports
//! ([`report`]), and TOML configuration ([`config`]).

#![warn(unreachable_pub)]

pub mod bulk;
pub mod config;
pub mod error;
pub mod loader;
pub mod nodes;
pub mod pipeline;
pub mod report;
pub mod router;
pub mod service;

pub use bulk::{BulkClassifier, BulkEvent, BulkSummary};
pub use config::{ConfigError, ProviderKind, TriageConfig, API_KEY_ENV};
pub use error::{TriageError, ValidationError};
pub use loader::{find_and_load_tickets, load_tickets, LoaderError};
pub use pipeline::{classify_graph, triage_graph};
pub use report::{ReportBuilder, TriageReport};
pub use service::{ClassifyOutcome, ResolveOutcome, TriageService};

/// Crate version, surfaced by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
