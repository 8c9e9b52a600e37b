use shuka_core::config::{EmbeddingProviderKind, EmbeddingSettings, RerankerSettings};
use shuka_embed::{build_embedder, build_reranker, FakeEmbedder};
use shuka_core::traits::Embedder;

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading a model or calling the network
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let settings = EmbeddingSettings { provider: EmbeddingProviderKind::Remote, dimension: 64, ..EmbeddingSettings::default() };
    let embedder = build_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 64, "embedding dim follows settings");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_tokens_bring_texts_closer() {
    let e = FakeEmbedder::new(128);
    let q = e.embed_text("eternal soul");
    let near = e.embed_text("the soul is eternal");
    let far = e.embed_text("three modes of nature");
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&q, &near) > dot(&q, &far));
    assert_eq!(e.dim(), 128);
}

#[test]
fn missing_reranker_model_is_reported() {
    let settings = RerankerSettings { model_dir: Some("/definitely/not/here".into()), ..RerankerSettings::default() };
    assert!(build_reranker(&settings).is_err());
}
