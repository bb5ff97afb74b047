//! Domain model for support-ticket triage.
//!
//! Everything in this crate is plain data: tickets as they arrive, the closed
//! label vocabulary, classification results, retrieved context, and the
//! resolution decision the router produces. There is no I/O and no policy
//! here; those live in the graph and core crates.

#![warn(unreachable_pub)]

pub mod classification;
pub mod context;
pub mod error;
pub mod resolution;
pub mod ticket;

pub use classification::{Classification, Label, Priority};
pub use context::{Answer, ContextChunk};
pub use error::ParseError;
pub use resolution::{ResolutionDecision, RoutingTeam};
pub use ticket::Ticket;
