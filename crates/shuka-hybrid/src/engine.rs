//! Query orchestration: citation shortcut, expansion, embedding, vector and
//! keyword retrieval, fusion, reranking.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, info, instrument, warn};

use shuka_core::citation::{self, CitationMatch};
use shuka_core::config::{SearchSettings, Settings};
use shuka_core::traits::{Embedder, KeywordIndex, VectorIndex};
use shuka_core::{Candidate, Corpus, Error, Language, QueryExpander, RankedResult, Result, SearchRequest, EXACT_SCORE};
use shuka_text::{keyword_candidates, scan, TantivyKeywordIndex};
use shuka_vector::{merge_variants, vector_candidates, LanceVectorIndex};

use crate::fusion::fuse;
use crate::rerank::{RerankMode, RerankStage};
use crate::response::{HealthReport, KeywordResultItem, KeywordSearchResponse, SearchResponse, SearchType, Stage};

/// One language's aligned corpus, vector index and keyword index.
#[derive(Clone)]
pub struct LanguageIndex {
    corpus: Arc<Corpus>,
    vectors: Arc<dyn VectorIndex>,
    keywords: Arc<dyn KeywordIndex>,
}

impl LanguageIndex {
    /// Refuses indices that do not cover exactly the corpus rows.
    pub fn new(corpus: Arc<Corpus>, vectors: Arc<dyn VectorIndex>, keywords: Arc<dyn KeywordIndex>) -> Result<Self> {
        corpus.check_aligned("vector index", vectors.len())?;
        corpus.check_aligned("keyword index", keywords.len())?;
        Ok(Self { corpus, vectors, keywords })
    }

    pub fn language(&self) -> Language {
        self.corpus.language()
    }

    /// Load the four on-disk artifacts of `language`.
    ///
    /// A missing keyword directory is rebuilt in memory from the corpus.
    pub async fn load(settings: &Settings, language: Language) -> Result<Self> {
        let paths = settings.data.artifacts(language);
        let corpus = Arc::new(Corpus::load(language, &paths.metadata, &paths.corpus)?);
        let keywords: Arc<dyn KeywordIndex> = if paths.keyword_dir.exists() {
            Arc::new(TantivyKeywordIndex::open(&paths.keyword_dir, &corpus)?)
        } else {
            warn!(%language, dir = %paths.keyword_dir.display(), "keyword index missing; building in memory");
            let built = shuka_text::index_corpus_in_ram(&corpus).map_err(|e| Error::Artifact(format!("keyword index for {language}: {e}")))?;
            Arc::new(built)
        };
        let vectors = LanceVectorIndex::open(&paths.vector_uri, &paths.vector_table, &corpus, settings.embedding.dimension).await?;
        Self::new(corpus, Arc::new(vectors), keywords)
    }
}

/// Result of a tolerated stage: its output, or the reason it was skipped.
enum StageOutcome<T> {
    Completed(T),
    Degraded(String),
}

impl<T: Default> StageOutcome<T> {
    fn from_result(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(v) => StageOutcome::Completed(v),
            Err(e) => StageOutcome::Degraded(e.to_string()),
        }
    }

    /// The stage output, or an empty default after recording `stage` as degraded.
    fn resolve(self, stage: Stage, degraded: &mut Vec<Stage>) -> T {
        match self {
            StageOutcome::Completed(v) => v,
            StageOutcome::Degraded(reason) => {
                warn!(?stage, %reason, "stage degraded");
                degraded.push(stage);
                T::default()
            }
        }
    }
}

pub struct EngineBuilder {
    settings: SearchSettings,
    embedder: Option<Arc<dyn Embedder>>,
    reranker: RerankStage,
    languages: Vec<LanguageIndex>,
}

impl EngineBuilder {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings, embedder: None, reranker: RerankStage::passthrough(), languages: Vec::new() }
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn reranker(mut self, reranker: RerankStage) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn language(mut self, index: LanguageIndex) -> Self {
        self.languages.push(index);
        self
    }

    /// Languages whose vector dimension differs from the embedder's are dropped.
    pub fn build(self) -> Result<Engine> {
        let embedder = self.embedder.ok_or_else(|| Error::Configuration("no embedding provider configured".into()))?;
        let mut indices = HashMap::new();
        let mut last_error = None;
        for index in self.languages {
            let language = index.language();
            if index.vectors.dim() != embedder.dim() {
                let e = Error::integrity(language, format!("vector dimension {} but embedder produces {}", index.vectors.dim(), embedder.dim()));
                error!(%language, error = %e, "language refused");
                last_error = Some(e);
                continue;
            }
            indices.insert(language, index);
        }
        if indices.is_empty() {
            return Err(last_error.unwrap_or_else(|| Error::Configuration("no language indices loaded".into())));
        }
        let expander = QueryExpander::new(self.settings.max_variants, self.settings.fuzzy_cutoff);
        Ok(Engine { indices, embedder, reranker: self.reranker, expander, settings: self.settings })
    }
}

/// Shared, read-only search engine; safe to use from concurrent requests.
pub struct Engine {
    indices: HashMap<Language, LanguageIndex>,
    embedder: Arc<dyn Embedder>,
    reranker: RerankStage,
    expander: QueryExpander,
    settings: SearchSettings,
}

impl Engine {
    pub fn builder(settings: SearchSettings) -> EngineBuilder {
        EngineBuilder::new(settings)
    }

    /// Load every configured language, skipping (and logging) the ones that fail.
    pub async fn load(settings: &Settings) -> Result<Self> {
        let embedding_settings = settings.embedding.clone();
        let embedder = task::spawn_blocking(move || shuka_embed::build_embedder(&embedding_settings))
            .await
            .map_err(|e| Error::Configuration(format!("embedding provider task failed: {e}")))?
            .map_err(|e| Error::Configuration(format!("embedding provider: {e:#}")))?;
        let reranker = load_reranker(settings).await;

        let mut builder = EngineBuilder::new(settings.search.clone()).embedder(embedder).reranker(reranker);
        let mut last_error = None;
        for &language in &settings.data.languages {
            match LanguageIndex::load(settings, language).await {
                Ok(index) => builder = builder.language(index),
                Err(e) => {
                    error!(%language, error = %e, "failed to load language; skipping");
                    last_error = Some(e);
                }
            }
        }
        if builder.languages.is_empty() {
            return Err(last_error.unwrap_or_else(|| Error::Configuration("no languages configured".into())));
        }
        let engine = builder.build()?;
        info!(languages = ?engine.languages(), reranker = engine.reranker.has_model(), "engine ready");
        Ok(engine)
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.indices.keys().copied().collect();
        languages.sort();
        languages
    }

    fn index_for(&self, language: &str) -> Result<&LanguageIndex> {
        let language: Language = language.parse()?;
        self.indices
            .get(&language)
            .ok_or_else(|| Error::Configuration(format!("language '{language}' is not loaded")))
    }

    fn effective_top_k(&self, requested: usize) -> usize {
        match requested {
            0 => self.settings.default_top_k,
            k => k.min(self.settings.max_top_k),
        }
    }

    /// Run the full hybrid pipeline under the configured query timeout.
    #[instrument(skip_all, fields(language = %request.language, top_k = request.top_k))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let index = self.index_for(&request.language)?;
        let top_k = self.effective_top_k(request.top_k);
        let limit = self.settings.query_timeout();
        tokio::time::timeout(limit, self.run(query, index, request, top_k))
            .await
            .map_err(|_| Error::Timeout(limit))?
    }

    async fn run(&self, query: &str, index: &LanguageIndex, request: &SearchRequest, top_k: usize) -> Result<SearchResponse> {
        let language = index.language();

        if let CitationMatch::Matched(reference) = citation::detect(query) {
            let exact = citation::find_exact(&reference, &index.corpus);
            if !exact.is_empty() {
                debug!(hits = exact.len(), "citation shortcut");
                let results = exact.into_iter().map(exact_result).collect();
                return Ok(SearchResponse::new(query, vec![query.to_string()], SearchType::ExactVerseReference, results, vec![]));
            }
            debug!(book = %reference.book, "citation matched no rows; running full pipeline");
        }

        let variants = if request.expand_query {
            self.expander.expand(query, language)
        } else {
            vec![query.to_string()]
        };
        let embeddings = self.embed(&variants).await?;

        let mut degraded = Vec::new();
        let fetch = top_k * 2;

        let vector = self
            .vector_stage(index, &embeddings, fetch, request.distance_threshold)
            .await
            .resolve(Stage::VectorSearch, &mut degraded);
        let keyword = self.keyword_stage(index, query, fetch).await.resolve(Stage::KeywordSearch, &mut degraded);
        debug!(vector = vector.len(), keyword = keyword.len(), "retrieval done");

        let fused = fuse(&[], &vector, &keyword, self.settings.rrf_k, top_k);
        let results = if request.use_reranking {
            self.rerank(query, fused, &mut degraded).await
        } else {
            fused
        };

        Ok(SearchResponse::new(query, variants, SearchType::Hybrid, results, degraded))
    }

    /// One vector per variant; any failure or shape mismatch fails the query.
    async fn embed(&self, variants: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        let texts = variants.to_vec();
        let embeddings = task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::Provider(format!("embedding task failed: {e}")))?
            .map_err(|e| Error::Provider(format!("{e:#}")))?;
        if embeddings.len() != variants.len() {
            return Err(Error::Provider(format!("expected {} embeddings, got {}", variants.len(), embeddings.len())));
        }
        let dim = self.embedder.dim();
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dim) {
            return Err(Error::Provider(format!("embedding has {} dimensions, expected {dim}", bad.len())));
        }
        Ok(embeddings)
    }

    async fn vector_stage(&self, index: &LanguageIndex, embeddings: &[Vec<f32>], fetch: usize, threshold: Option<f32>) -> StageOutcome<Vec<Candidate>> {
        let mut lists = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            match vector_candidates(index.vectors.as_ref(), &index.corpus, embedding, fetch, threshold).await {
                Ok(list) => lists.push(list),
                Err(e) => return StageOutcome::Degraded(format!("{e:#}")),
            }
        }
        StageOutcome::Completed(merge_variants(lists, fetch))
    }

    /// Tantivy search blocks, so it runs off the async workers.
    async fn keyword_stage(&self, index: &LanguageIndex, query: &str, fetch: usize) -> StageOutcome<Vec<Candidate>> {
        let keywords = Arc::clone(&index.keywords);
        let corpus = Arc::clone(&index.corpus);
        let query = query.to_string();
        match task::spawn_blocking(move || keyword_candidates(keywords.as_ref(), &corpus, &query, fetch)).await {
            Ok(result) => StageOutcome::from_result(result),
            Err(e) => StageOutcome::Degraded(format!("keyword task failed: {e}")),
        }
    }

    async fn rerank(&self, query: &str, fused: Vec<RankedResult>, degraded: &mut Vec<Stage>) -> Vec<RankedResult> {
        let stage = self.reranker.clone();
        let owned_query = query.to_string();
        let fallback = fused.clone();
        match task::spawn_blocking(move || stage.apply(&owned_query, fused)).await {
            Ok((results, RerankMode::Failed)) => {
                degraded.push(Stage::Rerank);
                results
            }
            Ok((results, _)) => results,
            Err(e) => {
                warn!(error = %e, "rerank task failed; keeping fused order");
                degraded.push(Stage::Rerank);
                fallback
            }
        }
    }

    /// Literal substring search over every chunk of one language.
    pub fn keyword_search(&self, query: &str, language: &str, case_sensitive: bool) -> Result<KeywordSearchResponse> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let index = self.index_for(language)?;
        let results: Vec<KeywordResultItem> = scan(&index.corpus, query, case_sensitive)
            .iter()
            .filter_map(|m| index.corpus.get(m.row).map(|record| KeywordResultItem::new(record, m)))
            .collect();
        Ok(KeywordSearchResponse {
            success: true,
            total_results: results.len(),
            results,
            query: query.to_string(),
            language: index.language(),
        })
    }

    pub fn health(&self) -> HealthReport {
        let languages: BTreeMap<Language, usize> = self.indices.iter().map(|(l, i)| (*l, i.corpus.len())).collect();
        HealthReport {
            status: if languages.is_empty() { "unhealthy" } else { "healthy" },
            languages,
            reranker: if self.reranker.has_model() { "model" } else { "passthrough" },
            embedding_dim: self.embedder.dim(),
        }
    }
}

fn exact_result(candidate: Candidate) -> RankedResult {
    RankedResult { candidate, fused_score: EXACT_SCORE, rerank_score: None, vector_rank: None, keyword_rank: None }
}

async fn load_reranker(settings: &Settings) -> RerankStage {
    if !settings.reranker.enabled {
        info!("reranker disabled; using passthrough");
        return RerankStage::passthrough();
    }
    let reranker_settings = settings.reranker.clone();
    match task::spawn_blocking(move || shuka_embed::build_reranker(&reranker_settings)).await {
        Ok(Ok(model)) => RerankStage::new(Some(model)),
        Ok(Err(e)) => {
            warn!(error = %e, "reranker unavailable; using passthrough");
            RerankStage::passthrough()
        }
        Err(e) => {
            warn!(error = %e, "reranker load task failed; using passthrough");
            RerankStage::passthrough()
        }
    }
}
