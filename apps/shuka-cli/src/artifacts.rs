//! Materialize aligned per-language artifacts from data that already exists:
//! the keyword index from the corpus text, the vector table from precomputed
//! embeddings.
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use shuka_core::config::Settings;
use shuka_core::traits::KeywordIndex;
use shuka_core::{Corpus, Language};
use shuka_text::KeywordIndexBuilder;
use shuka_vector::LanceVectorWriter;

#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub language: Language,
    pub rows: usize,
    pub path: PathBuf,
}

fn load_corpus(settings: &Settings, language: Language) -> Result<Corpus> {
    let paths = settings.data.artifacts(language);
    Ok(Corpus::load(language, &paths.metadata, &paths.corpus)?)
}

/// Rebuild `keyword_<lang>/` so that document n is corpus row n.
pub fn build_keyword(settings: &Settings, language: Language) -> Result<BuildSummary> {
    let corpus = load_corpus(settings, language)?;
    let dir = settings.data.artifacts(language).keyword_dir;
    let mut builder = KeywordIndexBuilder::create_in_dir(&dir, language)
        .with_context(|| format!("creating keyword index at {}", dir.display()))?;

    let pb = ProgressBar::new(corpus.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?.progress_chars("#>-"));
    for record in corpus.iter() {
        builder.add(&record.text)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    let index = builder.finish()?;
    corpus.check_aligned("keyword index", index.len())?;
    info!(%language, rows = corpus.len(), dir = %dir.display(), "keyword index rebuilt");
    Ok(BuildSummary { language, rows: corpus.len(), path: dir })
}

/// Write `input` (a JSON array of vectors, one per corpus row) into the
/// language's vector table. The table must not exist yet.
pub async fn import_vectors(settings: &Settings, language: Language, input: &Path) -> Result<BuildSummary> {
    let corpus = load_corpus(settings, language)?;
    let raw = std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let vectors: Vec<Vec<f32>> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;
    corpus.check_aligned("vector file", vectors.len())?;

    let dim = settings.embedding.dimension;
    if let Some((row, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
        bail!("row {row} has {} dimensions, embedding.dimension is {dim}", v.len());
    }

    let paths = settings.data.artifacts(language);
    let mut writer = LanceVectorWriter::create(&paths.vector_uri, &paths.vector_table, dim).await?;
    writer.write(&vectors).await?;
    Ok(BuildSummary { language, rows: vectors.len(), path: paths.vector_uri })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuka_core::config::DataSettings;
    use shuka_text::TantivyKeywordIndex;
    use tempfile::TempDir;

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.data = DataSettings { dir: dir.to_string_lossy().into_owned(), languages: vec![Language::En] };
        settings.embedding.dimension = 4;
        let paths = settings.data.artifacts(Language::En);
        std::fs::write(
            &paths.metadata,
            r#"{"structure": {"bg": {"2": {"embedding_key": "embeddings_0", "num_chunks": 2, "text_previews": ["a", "b"]}}}}"#,
        )
        .unwrap();
        std::fs::write(&paths.corpus, r#"{"bg": {"2": ["TEXT 1. the soul", "TEXT 2. the body"]}}"#).unwrap();
        settings
    }

    #[test]
    fn rebuilt_keyword_index_is_aligned() {
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let summary = build_keyword(&settings, Language::En).expect("build");
        assert_eq!(summary.rows, 2);

        let paths = settings.data.artifacts(Language::En);
        let corpus = Corpus::load(Language::En, &paths.metadata, &paths.corpus).unwrap();
        assert!(TantivyKeywordIndex::open(&summary.path, &corpus).is_ok());
    }

    #[tokio::test]
    async fn vector_import_checks_row_count_and_dimension() {
        let tmp = TempDir::new().unwrap();
        let settings = settings(tmp.path());
        let input = tmp.path().join("vectors.json");

        std::fs::write(&input, "[[1.0, 0.0, 0.0, 0.0]]").unwrap();
        assert!(import_vectors(&settings, Language::En, &input).await.is_err());

        std::fs::write(&input, "[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]").unwrap();
        assert!(import_vectors(&settings, Language::En, &input).await.is_err());

        std::fs::write(&input, "[[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]").unwrap();
        let summary = import_vectors(&settings, Language::En, &input).await.expect("import");
        assert_eq!(summary.rows, 2);
    }
}
