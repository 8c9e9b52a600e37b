//! HTTP embedding provider speaking the Gemini `batchEmbedContents` API.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use shuka_core::config::EmbeddingSettings;
use shuka_core::traits::Embedder;

#[derive(Serialize)]
struct BatchRequest<'a> { requests: Vec<EmbedRequest<'a>> }

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> { model: &'a str, content: Content<'a>, task_type: &'static str }

#[derive(Serialize)]
struct Content<'a> { parts: [Part<'a>; 1] }

#[derive(Serialize)]
struct Part<'a> { text: &'a str }

#[derive(Deserialize)]
struct BatchResponse { #[serde(default)] embeddings: Vec<Values> }

#[derive(Deserialize)]
struct Values { values: Vec<f32> }

pub struct RemoteEmbedder {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: String,
    dim: usize,
    batch_size: usize,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RemoteEmbedder {
    /// Reads the API key from the environment variable named in `settings`.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).with_context(|| format!("environment variable {} is not set", settings.api_key_env))?;
        Self::new(settings, api_key)
    }

    /// Builds the HTTP client once; it is reused by every batch.
    pub fn new(settings: &EmbeddingSettings, api_key: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(settings.timeout()).build().context("building HTTP client")?;
        let endpoint = settings.endpoint.trim_end_matches('/');
        Ok(Self {
            client,
            url: format!("{endpoint}/{}:batchEmbedContents", settings.model),
            model: settings.model.clone(),
            api_key,
            dim: settings.dimension,
            batch_size: settings.batch_size.max(1),
            min_interval: settings.min_interval(),
            last_request: Mutex::new(None),
        })
    }

    /// Sleep until `min_interval` has passed since the previous request.
    fn pace(&self) {
        let mut last = match self.last_request.lock() { Ok(g) => g, Err(poisoned) => poisoned.into_inner() };
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < self.min_interval { std::thread::sleep(self.min_interval - since); }
        }
        *last = Some(Instant::now());
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = BatchRequest {
            requests: texts
                .iter()
                .map(|t| EmbedRequest { model: &self.model, content: Content { parts: [Part { text: t }] }, task_type: "RETRIEVAL_QUERY" })
                .collect(),
        };
        self.pace();
        let resp = self.client.post(&self.url).query(&[("key", self.api_key.as_str())]).json(&body).send().map_err(|e| anyhow!("embedding request failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            warn!(%status, "embedding API error");
            return Err(anyhow!("embedding API returned {status}: {text}"));
        }
        let parsed: BatchResponse = resp.json().map_err(|e| anyhow!("malformed embedding response: {e}"))?;
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

impl Embedder for RemoteEmbedder {
    fn dim(&self) -> usize { self.dim }

    /// Blocking; call from a blocking-capable thread.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            debug!(batch = chunk.len(), "remote embedding batch");
            out.extend(self.embed_chunk(chunk)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_api_shape() {
        let body = BatchRequest { requests: vec![EmbedRequest { model: "models/text-embedding-004", content: Content { parts: [Part { text: "soul" }] }, task_type: "RETRIEVAL_QUERY" }] };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["requests"][0]["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(json["requests"][0]["content"]["parts"][0]["text"], "soul");
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let settings = EmbeddingSettings { endpoint: "https://example.test/v1beta/".into(), ..EmbeddingSettings::default() };
        let embedder = RemoteEmbedder::new(&settings, "k".into()).expect("embedder");
        assert_eq!(embedder.url, "https://example.test/v1beta/models/text-embedding-004:batchEmbedContents");
    }

    #[test]
    fn pacing_waits_between_requests() {
        let settings = EmbeddingSettings { min_interval_ms: 30, ..EmbeddingSettings::default() };
        let embedder = RemoteEmbedder::new(&settings, "k".into()).expect("embedder");
        let start = Instant::now();
        embedder.pace();
        embedder.pace();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let settings = EmbeddingSettings { api_key_env: "SHUKA_TEST_SURELY_UNSET_KEY".into(), ..EmbeddingSettings::default() };
        assert!(RemoteEmbedder::from_settings(&settings).is_err());
    }

    #[test]
    fn one_client_serves_every_batch() {
        let settings = EmbeddingSettings { endpoint: "http://127.0.0.1:9".into(), batch_size: 1, min_interval_ms: 0, timeout_ms: 500, ..EmbeddingSettings::default() };
        let embedder = RemoteEmbedder::new(&settings, "k".into()).expect("embedder");
        assert!(embedder.embed_batch(&[]).expect("empty batch").is_empty());
        for _ in 0..2 {
            let err = embedder.embed_batch(&["soul".to_string()]).unwrap_err();
            assert!(err.to_string().contains("embedding request failed"));
        }
    }
}
