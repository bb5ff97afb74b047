//! Runtime configuration.
//!
//! Everything tunable lives in one TOML file; every field has a default so
//! an empty file (or no file) runs the offline pipeline out of the box.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_graph::{ExecutorConfig, DEFAULT_MAX_CONCURRENT_NODES, DEFAULT_NODE_TIMEOUT};

/// Environment variable consulted when the config omits `api_key`.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Which implementation backs the classify, generate, and score seams.
/// Retrieval always runs against the local index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Heuristic,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub node_timeout_secs: u64,
    pub max_concurrent_nodes: usize,
    pub retrieval_top_k: usize,
    pub provider: ProviderKind,
    pub model: String,
    pub api_url: String,
    /// Falls back to [`API_KEY_ENV`] when unset.
    pub api_key: Option<String>,
    /// Directory of `.md`/`.txt` documents to index at startup.
    pub knowledge_dir: Option<PathBuf>,
    pub tickets_file: PathBuf,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            node_timeout_secs: DEFAULT_NODE_TIMEOUT.as_secs(),
            max_concurrent_nodes: DEFAULT_MAX_CONCURRENT_NODES,
            retrieval_top_k: triage_capability::DEFAULT_TOP_K,
            provider: ProviderKind::Heuristic,
            model: triage_capability::DEFAULT_MODEL.to_string(),
            api_url: triage_capability::DEFAULT_API_URL.to_string(),
            api_key: None,
            knowledge_dir: None,
            tickets_file: PathBuf::from("tickets.json"),
        }
    }
}

impl TriageConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new()
            .with_max_concurrent_nodes(self.max_concurrent_nodes)
            .with_node_timeout(Duration::from_secs(self.node_timeout_secs))
    }

    /// Explicit key wins; otherwise the environment is consulted. Blank
    /// values count as absent.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}
