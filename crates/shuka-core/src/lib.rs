#![deny(dead_code)]
#![deny(unused_variables)]

pub mod citation;
pub mod config;
pub mod corpus;
pub mod error;
pub mod expand;
pub mod traits;
pub mod types;

pub use citation::{CitationMatch, VerseRef, EXACT_SCORE};
pub use config::{Config, Settings};
pub use corpus::Corpus;
pub use error::{Error, Result};
pub use expand::QueryExpander;
pub use traits::{Embedder, KeywordIndex, Neighbor, Reranker, VectorIndex};
pub use types::{Candidate, ChunkRecord, ChunkRef, Language, RankedResult, RowId, SearchRequest, SourceTag};
