//! Query-side vector retrieval: normalize, over-fetch, threshold, dedupe, score.
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

use shuka_core::traits::VectorIndex;
use shuka_core::{Candidate, Corpus, SourceTag};
use shuka_embed::l2_normalize;

/// Up to `k` candidates for one query vector, best first.
///
/// Fetches `2k` neighbors so that dropping over-threshold and duplicate chunks
/// still leaves `k`. Score is `1 / (1 + distance)`.
#[instrument(skip_all, fields(k = k, threshold = ?distance_threshold))]
pub async fn vector_candidates(index: &dyn VectorIndex, corpus: &Corpus, query: &[f32], k: usize, distance_threshold: Option<f32>) -> Result<Vec<Candidate>> {
	let mut q = query.to_vec();
	l2_normalize(&mut q);
	let neighbors = index.search(&q, k * 2).await?;
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(k);
	for n in neighbors {
		if distance_threshold.is_some_and(|t| n.distance > t) { continue; }
		let Some(record) = corpus.get(n.row) else { continue };
		if !seen.insert(&record.chunk) { continue; }
		let mut c = Candidate::from_record(record, SourceTag::Vector, 1.0 / (1.0 + n.distance));
		c.distance = Some(n.distance);
		out.push(c);
		if out.len() == k { break; }
	}
	Ok(out)
}

/// Merge per-variant lists by row, keeping each row's best-scoring occurrence.
/// Ordered by descending score then ascending row; at most `keep` rows.
pub fn merge_variants(lists: Vec<Vec<Candidate>>, keep: usize) -> Vec<Candidate> {
	let mut best: HashMap<usize, Candidate> = HashMap::new();
	for c in lists.into_iter().flatten() {
		match best.get(&c.row) {
			Some(existing) if existing.raw_score >= c.raw_score => {}
			_ => { best.insert(c.row, c); }
		}
	}
	let mut merged: Vec<Candidate> = best.into_values().collect();
	merged.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score).then(a.row.cmp(&b.row)));
	merged.truncate(keep);
	merged
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::flat::FlatVectorIndex;
	use shuka_core::{ChunkRecord, ChunkRef, Language};

	fn corpus(chunks: &[(&str, usize)]) -> Corpus {
		let records = chunks
			.iter()
			.enumerate()
			.map(|(i, (chapter, idx))| ChunkRecord { row: i, chunk: ChunkRef { book: "bg".into(), chapter: chapter.to_string(), chunk_index: *idx }, preview: String::new(), text: format!("chunk {i}") })
			.collect();
		Corpus::from_records(Language::En, records)
	}

	fn candidate(row: usize, score: f32) -> Candidate {
		Candidate { row, raw_score: score, source: SourceTag::Vector, chunk: ChunkRef { book: "bg".into(), chapter: "1".into(), chunk_index: row }, text: String::new(), distance: None, verse: None }
	}

	#[tokio::test]
	async fn scores_follow_distance_and_respect_threshold() {
		let c = corpus(&[("1", 0), ("1", 1), ("1", 2)]);
		let index = FlatVectorIndex::new(2, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]]).unwrap();
		let hits = vector_candidates(&index, &c, &[2.0, 0.0], 3, None).await.unwrap();
		assert_eq!(hits.iter().map(|h| h.row).collect::<Vec<_>>(), vec![0, 1, 2]);
		assert!((hits[0].raw_score - 1.0).abs() < 1e-6, "zero distance scores 1");
		assert!((hits[1].raw_score - 1.0 / 3.0).abs() < 1e-6, "orthogonal unit vectors are 2 apart");

		let close = vector_candidates(&index, &c, &[1.0, 0.0], 3, Some(1.0)).await.unwrap();
		assert_eq!(close.len(), 1);
	}

	#[tokio::test]
	async fn duplicate_chunks_are_dropped() {
		let c = corpus(&[("1", 0), ("1", 0), ("1", 1)]);
		let index = FlatVectorIndex::new(2, vec![vec![1.0, 0.0], vec![1.0, 0.01], vec![0.0, 1.0]]).unwrap();
		let hits = vector_candidates(&index, &c, &[1.0, 0.0], 2, None).await.unwrap();
		assert_eq!(hits.iter().map(|h| h.row).collect::<Vec<_>>(), vec![0, 2]);
	}

	#[test]
	fn variants_merge_to_best_occurrence() {
		let merged = merge_variants(
			vec![vec![candidate(7, 0.4), candidate(1, 0.9)], vec![candidate(7, 0.8)], vec![candidate(7, 0.6), candidate(3, 0.8)]],
			10,
		);
		assert_eq!(merged.iter().map(|c| c.row).collect::<Vec<_>>(), vec![1, 3, 7]);
		assert_eq!(merged.iter().filter(|c| c.row == 7).count(), 1);
		assert!((merged[2].raw_score - 0.8).abs() < 1e-6);
		assert_eq!(merge_variants(vec![vec![candidate(1, 0.1), candidate(2, 0.2)]], 1).len(), 1);
	}
}
