//! Ticket file loading.
//!
//! Sample and bulk tickets live in a JSON array of `{id?, subject, body}`
//! objects. The CLI does not require the file to sit at one fixed path;
//! [`find_and_load_tickets`] walks a candidate list and loads the first
//! file that exists.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use triage_ticket::Ticket;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read tickets from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tickets from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no tickets file found at any of: {}", searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NotFound { searched: Vec<PathBuf> },
}

pub fn load_tickets(path: &Path) -> Result<Vec<Ticket>, LoaderError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tickets: Vec<Ticket> = serde_json::from_str(&raw).map_err(|source| LoaderError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), count = tickets.len(), "loaded tickets");
    Ok(tickets)
}

/// Load from the first candidate that exists, returning which one won.
pub fn find_and_load_tickets(candidates: &[PathBuf]) -> Result<(PathBuf, Vec<Ticket>), LoaderError> {
    for candidate in candidates {
        if candidate.is_file() {
            let tickets = load_tickets(candidate)?;
            return Ok((candidate.clone(), tickets));
        }
    }
    Err(LoaderError::NotFound {
        searched: candidates.to_vec(),
    })
}
