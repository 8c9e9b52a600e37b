//! Domain types shared by the retrievers, the fusion stage and the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Position of a chunk in the aligned per-language artifacts.
///
/// Row `i` of the corpus metadata, the vector index and the keyword index all
/// describe the same chunk.
pub type RowId = usize;

/// Languages the corpus is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ru,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Ru];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ru" => Ok(Language::Ru),
            other => Err(Error::Configuration(format!("unsupported language '{other}'"))),
        }
    }
}

/// Identity of a chunk inside one language's corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRef {
    pub book: String,
    pub chapter: String,
    pub chunk_index: usize,
}

/// One row of the flattened corpus metadata array.
///
/// - `row`: position in the aligned artifacts
/// - `chunk`: `(book, chapter, chunk_index)` identity
/// - `preview`: short text preview stored in the metadata file
/// - `text`: full chunk text, or the preview when the corpus has no text for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub row: RowId,
    pub chunk: ChunkRef,
    pub preview: String,
    pub text: String,
}

/// Indicates which signal produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Exact,
    Vector,
    Keyword,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceTag::Exact => "exact",
            SourceTag::Vector => "vector",
            SourceTag::Keyword => "keyword",
        })
    }
}

/// Per-query retrieval hit.
///
/// `raw_score` is signal-specific but higher is always better. `distance` is
/// only set for vector hits and `verse` only for exact citation hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub row: RowId,
    pub raw_score: f32,
    pub source: SourceTag,
    pub chunk: ChunkRef,
    pub text: String,
    pub distance: Option<f32>,
    pub verse: Option<String>,
}

impl Candidate {
    pub fn from_record(record: &ChunkRecord, source: SourceTag, raw_score: f32) -> Self {
        Self {
            row: record.row,
            raw_score,
            source,
            chunk: record.chunk.clone(),
            text: record.text.clone(),
            distance: None,
            verse: None,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.source == SourceTag::Exact
    }
}

/// A candidate after fusion, optionally rescored by the reranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub candidate: Candidate,
    pub fused_score: f32,
    pub rerank_score: Option<f32>,
    /// 1-based rank in the merged vector list, when the row was there.
    pub vector_rank: Option<usize>,
    /// 1-based rank in the keyword list, when the row was there.
    pub keyword_rank: Option<usize>,
}

impl RankedResult {
    pub fn is_exact(&self) -> bool {
        self.candidate.is_exact()
    }
}

/// A hybrid search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub language: String,
    pub top_k: usize,
    pub use_reranking: bool,
    pub expand_query: bool,
    pub distance_threshold: Option<f32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, language: Language, top_k: usize) -> Self {
        Self {
            query: query.into(),
            language: language.code().to_string(),
            top_k,
            use_reranking: true,
            expand_query: true,
            distance_threshold: None,
        }
    }

    pub fn with_reranking(mut self, enabled: bool) -> Self {
        self.use_reranking = enabled;
        self
    }

    pub fn with_expansion(mut self, enabled: bool) -> Self {
        self.expand_query = enabled;
        self
    }

    pub fn with_distance_threshold(mut self, threshold: Option<f32>) -> Self {
        self.distance_threshold = threshold;
        self
    }
}
