//! Embedding and reranking collaborators.
//!
//! - `remote`: HTTP embedding API (default provider)
//! - `model`: local candle XLM-RoBERTa encoder
//! - `fake`: deterministic hashing embedder, forced by `APP_USE_FAKE_EMBEDDINGS=1`
//! - `rerank`: local cross-encoder reranker
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use shuka_core::config::{EmbeddingProviderKind, EmbeddingSettings, RerankerSettings};
use shuka_core::traits::{Embedder, Reranker};

pub mod device;
pub mod fake;
pub mod model;
pub mod pool;
pub mod remote;
pub mod rerank;
pub mod tokenize;

pub use fake::FakeEmbedder;
pub use model::EmbeddingModel;
pub use pool::{l2_normalize, masked_mean_l2};
pub use remote::RemoteEmbedder;
pub use rerank::CrossEncoder;

const DEFAULT_EMBED_MODEL: &str = "bge-m3";
const DEFAULT_RERANK_MODEL: &str = "bge-reranker-v2-m3";

pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let provider = if fake::fake_embeddings_forced() { EmbeddingProviderKind::Fake } else { settings.provider };
    info!(?provider, dim = settings.dimension, "embedding provider");
    Ok(match provider {
        EmbeddingProviderKind::Fake => Arc::new(FakeEmbedder::new(settings.dimension)),
        EmbeddingProviderKind::Remote => Arc::new(RemoteEmbedder::from_settings(settings)?),
        EmbeddingProviderKind::Local => {
            let dir = model::resolve_model_dir(settings.model_dir.as_deref(), DEFAULT_EMBED_MODEL)?;
            Arc::new(EmbeddingModel::load(&dir, settings.max_len)?)
        }
    })
}

/// Fails when the model cannot be located or loaded; callers decide the fallback.
pub fn build_reranker(settings: &RerankerSettings) -> Result<Arc<dyn Reranker>> {
    let dir = model::resolve_model_dir(settings.model_dir.as_deref(), DEFAULT_RERANK_MODEL)?;
    Ok(Arc::new(CrossEncoder::load(&dir, settings.max_len)?))
}
