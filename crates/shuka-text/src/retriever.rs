use anyhow::Result;
use tracing::instrument;

use shuka_core::traits::KeywordIndex;
use shuka_core::{Candidate, Corpus, SourceTag};

/// BM25 candidates for `query`, best first, without non-positive scores.
#[instrument(skip(index, corpus), fields(language = %corpus.language()))]
pub fn keyword_candidates(index: &dyn KeywordIndex, corpus: &Corpus, query: &str, k: usize) -> Result<Vec<Candidate>> {
	let hits = index.search(query, k)?;
	Ok(hits
		.into_iter()
		.filter(|(_, score)| *score > 0.0)
		.filter_map(|(row, score)| corpus.get(row).map(|r| Candidate::from_record(r, SourceTag::Keyword, score)))
		.collect())
}
