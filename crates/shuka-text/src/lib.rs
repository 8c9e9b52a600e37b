//! shuka-text
//!
//! Tantivy keyword index over the aligned chunk rows, the keyword retriever
//! and a plain substring scanner.
pub mod index;
pub mod normalizer;
pub mod retriever;
pub mod scan;

pub use index::{index_corpus_in_ram, KeywordIndexBuilder, TantivyKeywordIndex};
pub use normalizer::normalize;
pub use retriever::keyword_candidates;
pub use scan::{scan, SubstringMatch};
