//! Adapter-level errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a capability call failed. The graph engine treats any of these as a
/// node failure; retry policy, if wanted, belongs inside the adapter.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The request never completed (connect, TLS, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// No API key configured for a remote provider.
    #[error("missing API key for {0}")]
    MissingApiKey(String),

    /// The provider answered 2xx but the payload was not usable.
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    /// The adapter cannot serve calls in its current state.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl CapabilityError {
    #[inline]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        CapabilityError::InvalidResponse(message.into())
    }
}

/// Map a non-success HTTP status plus response body to a [`CapabilityError`]
/// with an operator-friendly message. Bodies are truncated; provider error
/// payloads can be pages long.
#[must_use]
pub fn status_error(status: StatusCode, body: &str) -> CapabilityError {
    let detail: String = body.trim().chars().take(200).collect();
    let message = match status.as_u16() {
        401 => format!("authentication failed, check the API key ({detail})"),
        403 => format!("access forbidden ({detail})"),
        404 => format!("model or endpoint not found ({detail})"),
        429 => format!("rate limited ({detail})"),
        500..=599 => format!("provider internal error ({detail})"),
        _ => detail,
    };
    CapabilityError::Api {
        status: status.as_u16(),
        message,
    }
}
