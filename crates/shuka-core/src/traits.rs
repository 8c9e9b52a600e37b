//! Seams between the engine and its collaborators.
//!
//! Implementations live in the sibling crates (`shuka-embed`, `shuka-text`,
//! `shuka-vector`); tests substitute in-memory versions.

use futures::future::BoxFuture;

use crate::types::RowId;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Pairwise `(query, document)` relevance scorer.
///
/// Returns `(document_index, score)` pairs; higher is more relevant.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, documents: &[String]) -> anyhow::Result<Vec<(usize, f32)>>;
}

/// A nearest-neighbor hit: the aligned row and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: RowId,
    pub distance: f32,
}

/// Read-only nearest-neighbor index over one L2-normalized vector per row.
pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;
    fn dim(&self) -> usize;
    /// Up to `k` neighbors ordered by ascending distance.
    fn search<'a>(&'a self, query: &'a [f32], k: usize) -> BoxFuture<'a, anyhow::Result<Vec<Neighbor>>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only term-frequency index over the tokenized chunk text.
pub trait KeywordIndex: Send + Sync {
    fn len(&self) -> usize;
    /// Up to `k` `(row, score)` pairs ordered by descending score.
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<(RowId, f32)>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
