//! The incoming support ticket.

use serde::{Deserialize, Serialize};

/// An immutable support ticket as supplied by the caller or a sample file.
///
/// The canonical unit passed to every capability is [`Ticket::text`]: subject
/// and body joined with a newline, then trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Caller-assigned identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub subject: String,
    pub body: String,
}

impl Ticket {
    #[inline]
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            subject: subject.into(),
            body: body.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Canonical ticket text: `subject + "\n" + body`, trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
            .trim()
            .to_string()
    }

    /// The ticket id, or a positional fallback for unlabeled bulk input.
    #[must_use]
    pub fn display_id(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("TICKET-{}", index + 1),
        }
    }
}
