use anyhow::{anyhow, Result};
use std::path::Path;

use candle_core::Device;
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use shuka_core::traits::Reranker;

use crate::device::select_device;
use crate::model::{load_config, load_tokenizer, load_weights};
use crate::tokenize::tokenize_pair_on_device;

/// XLM-RoBERTa cross-encoder producing one relevance logit per (query, document).
pub struct CrossEncoder { model: XLMRobertaForSequenceClassification, tokenizer: Tokenizer, device: Device, max_len: usize }

impl CrossEncoder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading reranker");
        let tokenizer = load_tokenizer(model_dir)?;
        let config = load_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaForSequenceClassification::new(1, &config, vb)?;
        Ok(Self { model, tokenizer, device, max_len })
    }

    fn score(&self, query: &str, document: &str) -> Result<f32> {
        let input = tokenize_pair_on_device(&self.tokenizer, query, document, self.max_len, &self.device)?;
        let logits = self.model.forward(&input.input_ids, &input.attention_mask, &input.token_type_ids)?;
        let values: Vec<f32> = logits.to_device(&Device::Cpu)?.flatten_all()?.to_vec1()?;
        values.first().copied().ok_or_else(|| anyhow!("reranker returned no logits"))
    }
}

impl Reranker for CrossEncoder {
    fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<(usize, f32)>> {
        let mut scored = documents.iter().enumerate().map(|(i, d)| Ok((i, self.score(query, d)?))).collect::<Result<Vec<_>>>()?;
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        debug!(documents = documents.len(), "reranked");
        Ok(scored)
    }
}
