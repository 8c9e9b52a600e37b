//! Reciprocal Rank Fusion over the exact, vector and keyword lists.

use std::collections::HashMap;

use shuka_core::{Candidate, RankedResult, RowId, SourceTag, EXACT_SCORE};

/// Standard RRF `k`; larger values flatten the weight given to top ranks.
pub const RRF_K: usize = 60;

struct Accumulator {
    candidate: Candidate,
    score: f32,
    /// Once set, the row keeps `EXACT_SCORE` and ignores further contributions.
    exact: bool,
    vector_rank: Option<usize>,
    keyword_rank: Option<usize>,
}

/// Fuse best-first lists into at most `top_k` results.
///
/// Each list contributes `1 / (k + rank + 1)` per row (0-based rank). Exact
/// rows get `EXACT_SCORE` instead and sort ahead of everything else; the rest
/// sort by descending score, then ascending row id.
pub fn fuse(exact: &[Candidate], vector: &[Candidate], keyword: &[Candidate], k: usize, top_k: usize) -> Vec<RankedResult> {
    let k_param = k as f32;
    let mut acc: HashMap<RowId, Accumulator> = HashMap::new();

    for c in exact {
        acc.entry(c.row).or_insert_with(|| Accumulator { candidate: c.clone(), score: EXACT_SCORE, exact: true, vector_rank: None, keyword_rank: None });
    }

    for (source, list) in [(SourceTag::Vector, vector), (SourceTag::Keyword, keyword)] {
        for (rank, c) in list.iter().enumerate() {
            let entry = acc
                .entry(c.row)
                .or_insert_with(|| Accumulator { candidate: c.clone(), score: 0.0, exact: false, vector_rank: None, keyword_rank: None });
            if entry.exact {
                continue;
            }
            entry.score += 1.0 / (k_param + (rank + 1) as f32);
            match source {
                SourceTag::Vector => entry.vector_rank = Some(rank + 1),
                _ => entry.keyword_rank = Some(rank + 1),
            }
        }
    }

    let mut fused: Vec<Accumulator> = acc.into_values().collect();
    fused.sort_by(|a, b| {
        b.exact
            .cmp(&a.exact)
            .then(b.score.total_cmp(&a.score))
            .then(a.candidate.row.cmp(&b.candidate.row))
    });
    fused.truncate(top_k);
    fused
        .into_iter()
        .map(|a| RankedResult { candidate: a.candidate, fused_score: a.score, rerank_score: None, vector_rank: a.vector_rank, keyword_rank: a.keyword_rank })
        .collect()
}
