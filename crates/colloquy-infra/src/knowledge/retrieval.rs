//! Keyword-overlap retrievers over the file-backed knowledge base.
//!
//! The original corpus is small enough that a term-overlap score over
//! in-memory chunks replaces a vector index: chunks are tokenized once at
//! load, queries are scored by shared-term count. The role filter
//! restricts dialogue chunks to scenes the bot role appears in, matching
//! how role-play retrieval is meant to behave.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use colloquy_core::retrieval::Retriever;
use colloquy_types::error::EngineError;

/// One entry of `chunks.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogChunk {
    pub text: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

struct IndexedChunk {
    text: String,
    roles: Vec<String>,
    terms: BTreeSet<String>,
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Retriever over the dialogue chunk corpus.
pub struct ChunkRetriever {
    chunks: Vec<IndexedChunk>,
}

impl ChunkRetriever {
    /// Load `chunks.json`. Missing or malformed files yield an empty
    /// corpus so a bare checkout still starts.
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to read chunks file {}: {err}", path.display());
                return Self { chunks: Vec::new() };
            }
        };
        let parsed: Vec<DialogChunk> = match serde_json::from_str(&content) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("failed to parse chunks file {}: {err}", path.display());
                Vec::new()
            }
        };
        info!(chunks = parsed.len(), "dialogue corpus loaded");
        Self::from_chunks(parsed)
    }

    pub fn from_chunks(chunks: Vec<DialogChunk>) -> Self {
        let chunks = chunks
            .into_iter()
            .map(|chunk| IndexedChunk {
                terms: tokenize(&chunk.text),
                text: chunk.text,
                roles: chunk.roles,
            })
            .collect();
        Self { chunks }
    }
}

impl Retriever for ChunkRetriever {
    async fn retrieve(
        &self,
        query: &str,
        role_filter: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<String>, EngineError> {
        let query_terms = tokenize(query);
        let mut scored: Vec<(usize, &IndexedChunk)> = self
            .chunks
            .iter()
            .filter(|chunk| match role_filter {
                Some(role) => chunk.roles.iter().any(|r| r == role),
                None => true,
            })
            .map(|chunk| (chunk.terms.intersection(&query_terms).count(), chunk))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, chunk)| chunk.text.clone())
            .collect())
    }
}

/// Retriever over the background knowledge file, one paragraph per
/// snippet.
pub struct BackgroundRetriever {
    paragraphs: Vec<(BTreeSet<String>, String)>,
}

impl BackgroundRetriever {
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to read background file {}: {err}", path.display());
                String::new()
            }
        };
        Self::from_text(&content)
    }

    pub fn from_text(content: &str) -> Self {
        let paragraphs = content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| (tokenize(p), p.to_string()))
            .collect();
        Self { paragraphs }
    }
}

impl Retriever for BackgroundRetriever {
    async fn retrieve(
        &self,
        query: &str,
        _role_filter: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<String>, EngineError> {
        let query_terms = tokenize(query);
        let mut scored: Vec<(usize, &String)> = self
            .paragraphs
            .iter()
            .map(|(terms, text)| (terms.intersection(&query_terms).count(), text))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, text)| text.clone())
            .collect())
    }
}
