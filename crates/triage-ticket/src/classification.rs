//! The closed classification vocabulary and the classification result.
//!
//! Labels and priorities are deliberately enums rather than strings: every
//! downstream routing rule matches on them, so an out-of-vocabulary value
//! must be rejected at the adapter boundary, not discovered mid-route.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One of the 11 tags a ticket can carry.
///
/// Wire names are exact (`"How-to"`, `"API/SDK"`, ...) and round-trip through
/// serde and [`FromStr`]/[`fmt::Display`] unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "How-to")]
    HowTo,
    Product,
    Connector,
    Lineage,
    #[serde(rename = "API/SDK")]
    ApiSdk,
    #[serde(rename = "SSO")]
    Sso,
    Glossary,
    #[serde(rename = "Best practices")]
    BestPractices,
    #[serde(rename = "Sensitive data")]
    SensitiveData,
    Bug,
    Permissions,
}

impl Label {
    /// The full vocabulary, in canonical order.
    pub const ALL: [Label; 11] = [
        Label::HowTo,
        Label::Product,
        Label::Connector,
        Label::Lineage,
        Label::ApiSdk,
        Label::Sso,
        Label::Glossary,
        Label::BestPractices,
        Label::SensitiveData,
        Label::Bug,
        Label::Permissions,
    ];

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::HowTo => "How-to",
            Label::Product => "Product",
            Label::Connector => "Connector",
            Label::Lineage => "Lineage",
            Label::ApiSdk => "API/SDK",
            Label::Sso => "SSO",
            Label::Glossary => "Glossary",
            Label::BestPractices => "Best practices",
            Label::SensitiveData => "Sensitive data",
            Label::Bug => "Bug",
            Label::Permissions => "Permissions",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ParseError::UnknownLabel(s.to_string()))
    }
}

/// Ticket priority, P0 (most urgent) through P3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P0" => Ok(Priority::P0),
            "P1" => Ok(Priority::P1),
            "P2" => Ok(Priority::P2),
            "P3" => Ok(Priority::P3),
            _ => Err(ParseError::UnknownPriority(s.to_string())),
        }
    }
}

/// The classify node's output: ordered labels plus sentiment and priority.
///
/// Label order is meaningful (the routing template quotes the *first* label),
/// so this is a `Vec`, not a set. Duplicates are harmless; routing rules test
/// membership only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub labels: Vec<Label>,
    pub sentiment: String,
    pub priority: Priority,
}

impl Classification {
    #[inline]
    #[must_use]
    pub fn new(labels: Vec<Label>, sentiment: impl Into<String>, priority: Priority) -> Self {
        Self {
            labels,
            sentiment: sentiment.into(),
            priority,
        }
    }

    #[inline]
    #[must_use]
    pub fn has_label(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    #[inline]
    #[must_use]
    pub fn first_label(&self) -> Option<Label> {
        self.labels.first().copied()
    }
}
