//! Parse errors for the closed vocabularies.

use thiserror::Error;

/// Failure to map a wire string onto one of the closed vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The label is not one of the 11 known tags.
    #[error("unknown label '{0}'")]
    UnknownLabel(String),

    /// The priority is not one of P0..P3.
    #[error("unknown priority '{0}'")]
    UnknownPriority(String),
}
