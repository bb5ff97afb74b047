//! Error surface of the orchestration layer.

use thiserror::Error;
use triage_capability::CapabilityError;
use triage_graph::{ExecutionError, GraphDefinitionError, GraphState};

use crate::config::ConfigError;
use crate::loader::LoaderError;

/// Rejections raised before a run is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticket text is empty")]
    EmptyTicketText,
}

/// Anything a triage entry point can fail with.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("invalid ticket: {0}")]
    Validation(#[from] ValidationError),

    #[error("graph definition: {0}")]
    Definition(#[from] GraphDefinitionError),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("capability setup: {0}")]
    Capability(#[from] CapabilityError),

    #[error("internal: {0}")]
    Internal(String),
}

impl TriageError {
    /// Name of the node that failed, when the run got far enough to have one.
    #[must_use]
    pub fn failed_node(&self) -> Option<&str> {
        match self {
            Self::Execution(err) => err.failed_node(),
            _ => None,
        }
    }

    /// State accumulated before the failure, when a node failure produced one.
    #[must_use]
    pub fn partial_state(&self) -> Option<&GraphState> {
        match self {
            Self::Execution(err) => err.partial_state(),
            _ => None,
        }
    }
}
