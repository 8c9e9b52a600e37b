//! shuka-hybrid
//!
//! The search engine proper: per-language indices, reciprocal rank fusion,
//! optional cross-encoder reranking and the JSON response shapes.
pub mod engine;
pub mod fusion;
pub mod rerank;
pub mod response;

pub use engine::{Engine, EngineBuilder, LanguageIndex};
pub use fusion::{fuse, RRF_K};
pub use rerank::{RerankMode, RerankStage, PASSTHROUGH_SCORE};
pub use response::{FailureResponse, HealthReport, KeywordSearchResponse, SearchResponse, SearchType, Stage};
