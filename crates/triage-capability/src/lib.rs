//! Capability adapters for ticket triage.
//!
//! The graph nodes in the core crate talk to classification, retrieval,
//! generation, and scoring through the traits in [`traits`]; this crate
//! supplies the implementations:
//!
//! - [`HeuristicTriage`]: deterministic keyword rules, no I/O
//! - [`MemoryIndex`]: TF-IDF retrieval over locally loaded documents
//! - [`OpenAiProvider`]: chat-completions client for OpenAI-compatible APIs
//!
//! [`Capabilities`] bundles one implementation per seam so the rest of the
//! system never names a concrete provider.

#![warn(unreachable_pub)]

pub mod error;
pub mod heuristic;
pub mod memory_index;
pub mod openai;
pub mod traits;

pub use error::{status_error, CapabilityError};
pub use heuristic::HeuristicTriage;
pub use memory_index::{MemoryIndex, DEFAULT_TOP_K};
pub use openai::{OpenAiProvider, DEFAULT_API_URL, DEFAULT_MODEL};
pub use traits::{
    AnswerGenerator, Capabilities, ConfidenceScorer, ContextRetriever, TicketClassifier,
};
