//! In-memory retrieval index.
//!
//! The in-process stand-in for an external vector store: documents are added
//! once at startup (individually or from a directory of `.md`/`.txt` files)
//! and scored against queries with a TF-IDF weighting. Ranking is fully
//! deterministic; ties keep insertion order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;
use triage_ticket::ContextChunk;

use crate::error::CapabilityError;
use crate::traits::ContextRetriever;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("valid token pattern"));

/// Lowercased alphanumeric terms of `text`.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Number of chunks retrieved per query unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

struct IndexedDoc {
    content: String,
    source: Option<String>,
    term_counts: HashMap<String, usize>,
    norm: f64,
}

/// Read-mostly document index. Writers only exist during startup seeding;
/// queries take the read lock.
pub struct MemoryIndex {
    docs: RwLock<Vec<IndexedDoc>>,
    top_k: usize,
}

impl MemoryIndex {
    #[must_use]
    pub fn new(top_k: usize) -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            top_k: top_k.max(1),
        }
    }

    pub fn add_document(&self, content: &str, source: Option<&str>) {
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        for term in tokenize(content) {
            *term_counts.entry(term).or_insert(0) += 1;
        }
        let norm = term_counts
            .values()
            .map(|count| (*count * *count) as f64)
            .sum::<f64>()
            .sqrt()
            .max(1.0);
        self.docs.write().push(IndexedDoc {
            content: content.to_string(),
            source: source.map(str::to_string),
            term_counts,
            norm,
        });
    }

    /// Index every `.md` and `.txt` file directly under `dir`, using the file
    /// name as the source identifier. Files are added in name order so
    /// retrieval ties stay stable across platforms.
    pub fn load_directory(&self, dir: &Path) -> io::Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("md" | "txt")
                )
            })
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let source = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string);
            self.add_document(&content, source.as_deref());
            added += 1;
        }
        debug!(dir = %dir.display(), added, "indexed knowledge documents");
        Ok(added)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    fn ranked(&self, query: &str) -> Vec<ContextChunk> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }
        let docs = self.docs.read();
        let total = docs.len() as f64;
        if docs.is_empty() {
            return Vec::new();
        }

        let mut query_counts: HashMap<&str, usize> = HashMap::new();
        for term in &query_terms {
            *query_counts.entry(term.as_str()).or_insert(0) += 1;
        }
        let idf: HashMap<&str, f64> = query_counts
            .keys()
            .map(|term| {
                let df = docs
                    .iter()
                    .filter(|doc| doc.term_counts.contains_key(*term))
                    .count() as f64;
                let weight = if df == 0.0 { 0.0 } else { (1.0 + total / df).ln() };
                (*term, weight)
            })
            .collect();

        let mut scored: Vec<(f64, &IndexedDoc)> = docs
            .iter()
            .map(|doc| {
                let score: f64 = query_counts
                    .iter()
                    .map(|(term, query_count)| {
                        let tf = doc.term_counts.get(*term).copied().unwrap_or(0) as f64;
                        tf * idf.get(term).copied().unwrap_or(0.0) * *query_count as f64
                    })
                    .sum::<f64>()
                    / doc.norm;
                (score, doc)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, doc)| ContextChunk {
                content: doc.content.clone(),
                source: doc.source.clone(),
            })
            .collect()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

#[async_trait]
impl ContextRetriever for MemoryIndex {
    async fn retrieve(&self, text: &str) -> Result<Vec<ContextChunk>, CapabilityError> {
        Ok(self.ranked(text))
    }
}
