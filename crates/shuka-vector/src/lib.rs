//! shuka-vector
//!
//! LanceDB-backed nearest-neighbor index over the aligned chunk rows, an
//! in-memory flat index, and the query-side retriever that turns neighbors
//! into scored candidates.
pub mod flat;
pub mod index;
pub mod retriever;
pub mod schema;
pub mod table;
pub mod writer;

pub use flat::FlatVectorIndex;
pub use index::LanceVectorIndex;
pub use retriever::{merge_variants, vector_candidates};
pub use writer::LanceVectorWriter;
