//! Serializable query results and the failure envelope.
use serde::Serialize;
use std::collections::BTreeMap;

use shuka_core::{ChunkRecord, Error, Language, RankedResult, SourceTag};
use shuka_text::SubstringMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    ExactVerseReference,
    Hybrid,
}

/// Pipeline stages whose failure is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    VectorSearch,
    KeywordSearch,
    Rerank,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub text: String,
    pub book: String,
    pub chapter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verse: Option<String>,
    pub chunk_index: usize,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    pub source: SourceTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_rank: Option<usize>,
}

impl From<RankedResult> for SearchResultItem {
    fn from(r: RankedResult) -> Self {
        let c = r.candidate;
        Self {
            text: c.text,
            book: c.chunk.book,
            chapter: c.chunk.chapter,
            verse: c.verse,
            chunk_index: c.chunk.chunk_index,
            score: r.fused_score,
            rerank_score: r.rerank_score,
            source: c.source,
            vector_rank: r.vector_rank,
            keyword_rank: r.keyword_rank,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchResultItem>,
    pub query: String,
    pub query_variants: Vec<String>,
    pub search_type: SearchType,
    pub count: usize,
    pub degraded: Vec<Stage>,
}

impl SearchResponse {
    pub fn new(query: &str, query_variants: Vec<String>, search_type: SearchType, results: Vec<RankedResult>, degraded: Vec<Stage>) -> Self {
        let results: Vec<SearchResultItem> = results.into_iter().map(SearchResultItem::from).collect();
        Self { success: true, count: results.len(), results, query: query.to_string(), query_variants, search_type, degraded }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordResultItem {
    pub text: String,
    pub book: String,
    pub chapter: String,
    pub chunk_index: usize,
    pub occurrences: usize,
    pub score: f32,
}

impl KeywordResultItem {
    pub fn new(record: &ChunkRecord, m: &SubstringMatch) -> Self {
        Self {
            text: record.text.clone(),
            book: record.chunk.book.clone(),
            chapter: record.chunk.chapter.clone(),
            chunk_index: record.chunk.chunk_index,
            occurrences: m.occurrences,
            score: m.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordSearchResponse {
    pub success: bool,
    pub results: Vec<KeywordResultItem>,
    pub query: String,
    pub language: Language,
    pub total_results: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub kind: &'static str,
}

impl From<&Error> for FailureResponse {
    fn from(e: &Error) -> Self {
        Self { success: false, error: e.to_string(), kind: e.kind() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    /// Loaded languages and their row counts.
    pub languages: BTreeMap<Language, usize>,
    pub reranker: &'static str,
    pub embedding_dim: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_envelope_shape() {
        let v = serde_json::to_value(FailureResponse::from(&Error::EmptyQuery)).unwrap();
        assert_eq!(v, json!({"success": false, "error": "Query is empty", "kind": "empty_query"}));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let response = SearchResponse::new("q", vec!["q".into()], SearchType::Hybrid, vec![], vec![Stage::KeywordSearch]);
        let v = serde_json::to_value(&response).unwrap();
        assert_eq!(v["search_type"], "hybrid");
        assert_eq!(v["degraded"], json!(["keyword_search"]));
        assert_eq!(v["count"], 0);
    }
}
