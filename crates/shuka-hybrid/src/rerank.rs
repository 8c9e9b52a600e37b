use std::sync::Arc;
use tracing::warn;

use shuka_core::traits::Reranker;
use shuka_core::RankedResult;

/// Uniform score given when no model scores a row, and to exact rows.
pub const PASSTHROUGH_SCORE: f32 = 1.0;

/// Reranking with a built-in passthrough when the model is absent or fails.
#[derive(Clone)]
pub struct RerankStage { model: Option<Arc<dyn Reranker>> }

/// What the stage actually did, so the caller can report degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankMode {
    Model,
    Passthrough,
    /// A model exists but failed on this query.
    Failed,
}

impl RerankStage {
    pub fn new(model: Option<Arc<dyn Reranker>>) -> Self { Self { model } }

    pub fn passthrough() -> Self { Self { model: None } }

    pub fn has_model(&self) -> bool { self.model.is_some() }

    /// Exact rows stay on top with `PASSTHROUGH_SCORE`; the rest are ordered by
    /// the model's score, or keep their fused order when there is no usable model.
    pub fn apply(&self, query: &str, fused: Vec<RankedResult>) -> (Vec<RankedResult>, RerankMode) {
        let (mut exact, rest): (Vec<_>, Vec<_>) = fused.into_iter().partition(RankedResult::is_exact);
        for r in &mut exact { r.rerank_score = Some(PASSTHROUGH_SCORE); }

        let (rest, mode) = match &self.model {
            None => (passthrough(rest), RerankMode::Passthrough),
            Some(_) if rest.is_empty() => (rest, RerankMode::Model),
            Some(model) => {
                let documents: Vec<String> = rest.iter().map(|r| r.candidate.text.clone()).collect();
                match model.rerank(query, &documents) {
                    Ok(scores) => match reorder(rest.clone(), &scores) {
                        Some(reranked) => (reranked, RerankMode::Model),
                        None => {
                            warn!("reranker returned an invalid permutation; keeping fused order");
                            (passthrough(rest), RerankMode::Failed)
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "reranker failed; keeping fused order");
                        (passthrough(rest), RerankMode::Failed)
                    }
                }
            }
        };
        exact.extend(rest);
        (exact, mode)
    }
}

fn passthrough(mut rest: Vec<RankedResult>) -> Vec<RankedResult> {
    for r in &mut rest { r.rerank_score = Some(PASSTHROUGH_SCORE); }
    rest
}

/// Apply `(index, score)` pairs; `None` unless they cover every row exactly once.
fn reorder(rest: Vec<RankedResult>, scores: &[(usize, f32)]) -> Option<Vec<RankedResult>> {
    if scores.len() != rest.len() { return None; }
    let mut slots: Vec<Option<RankedResult>> = rest.into_iter().map(Some).collect();
    let mut ordered: Vec<(f32, usize, RankedResult)> = Vec::with_capacity(slots.len());
    for &(i, score) in scores {
        let mut r = slots.get_mut(i)?.take()?;
        r.rerank_score = Some(score);
        ordered.push((score, i, r));
    }
    ordered.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    Some(ordered.into_iter().map(|(_, _, r)| r).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuka_core::{Candidate, ChunkRef, RowId, SourceTag};

    struct Reverse;
    impl Reranker for Reverse {
        fn rerank(&self, _query: &str, documents: &[String]) -> anyhow::Result<Vec<(usize, f32)>> {
            Ok((0..documents.len()).map(|i| (i, i as f32)).collect())
        }
    }

    struct Broken;
    impl Reranker for Broken {
        fn rerank(&self, _query: &str, _documents: &[String]) -> anyhow::Result<Vec<(usize, f32)>> {
            anyhow::bail!("model crashed")
        }
    }

    fn ranked(row: RowId, source: SourceTag) -> RankedResult {
        RankedResult {
            candidate: Candidate { row, raw_score: 0.1, source, chunk: ChunkRef { book: "bg".into(), chapter: "2".into(), chunk_index: row }, text: format!("row {row}"), distance: None, verse: None },
            fused_score: 0.0,
            rerank_score: None,
            vector_rank: None,
            keyword_rank: None,
        }
    }

    fn rows(results: &[RankedResult]) -> Vec<RowId> { results.iter().map(|r| r.candidate.row).collect() }

    #[test]
    fn model_reorders_only_non_exact_rows() {
        let stage = RerankStage::new(Some(Arc::new(Reverse)));
        let input = vec![ranked(9, SourceTag::Exact), ranked(1, SourceTag::Vector), ranked(2, SourceTag::Keyword), ranked(3, SourceTag::Vector)];
        let (out, mode) = stage.apply("q", input);
        assert_eq!(mode, RerankMode::Model);
        assert_eq!(rows(&out), vec![9, 3, 2, 1]);
        assert_eq!(out[0].rerank_score, Some(PASSTHROUGH_SCORE));
        assert_eq!(out[1].rerank_score, Some(2.0));
    }

    #[test]
    fn failure_degrades_to_fused_order() {
        let stage = RerankStage::new(Some(Arc::new(Broken)));
        let (out, mode) = stage.apply("q", vec![ranked(1, SourceTag::Vector), ranked(2, SourceTag::Vector)]);
        assert_eq!(mode, RerankMode::Failed);
        assert_eq!(rows(&out), vec![1, 2]);
        assert!(out.iter().all(|r| r.rerank_score == Some(PASSTHROUGH_SCORE)));
    }

    #[test]
    fn passthrough_keeps_order() {
        let (out, mode) = RerankStage::passthrough().apply("q", vec![ranked(4, SourceTag::Keyword), ranked(2, SourceTag::Vector)]);
        assert_eq!(mode, RerankMode::Passthrough);
        assert_eq!(rows(&out), vec![4, 2]);
    }

    #[test]
    fn invalid_permutations_are_rejected() {
        assert!(reorder(vec![ranked(1, SourceTag::Vector)], &[(3, 1.0)]).is_none());
        assert!(reorder(vec![ranked(1, SourceTag::Vector), ranked(2, SourceTag::Vector)], &[(0, 1.0), (0, 2.0)]).is_none());
    }
}
