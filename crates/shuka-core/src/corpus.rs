//! Per-language corpus metadata, flattened into the aligned row array.
//!
//! The build pipeline persists two JSON artifacts per language:
//!
//! - metadata: `{"structure": {book: {chapter: {embedding_key, num_chunks, text_previews}}}}`
//! - corpus: `{book: {chapter: [chunk_text, ...]}}`
//!
//! Chapters are ordered by the numeric suffix of `embedding_key`
//! (`embeddings_<n>`), which is the order the vectors were written in; equal
//! keys keep the order they appear in the file. Each chapter then contributes
//! `num_chunks` consecutive rows.
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{ChunkRecord, ChunkRef, Language, RowId};

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterEntry {
    /// Chapters without a key have no vectors and contribute no rows.
    #[serde(default)]
    pub embedding_key: Option<String>,
    #[serde(default)]
    pub num_chunks: usize,
    #[serde(default)]
    pub text_previews: Vec<String>,
}

pub type Structure = IndexMap<String, IndexMap<String, ChapterEntry>>;

/// The metadata file, either wrapped in `structure` or as a bare book map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MetadataFile {
    Wrapped { structure: Structure },
    Bare(Structure),
}

impl MetadataFile {
    pub fn structure(&self) -> &Structure {
        match self {
            MetadataFile::Wrapped { structure } | MetadataFile::Bare(structure) => structure,
        }
    }
}

/// `{book: {chapter: [chunk_text, ...]}}`
pub type CorpusFile = IndexMap<String, IndexMap<String, Vec<String>>>;

/// Chapters whose key does not parse sort after every numbered one.
fn embedding_order(key: &str) -> usize {
    key.split('_').nth(1).and_then(|n| n.parse().ok()).unwrap_or(usize::MAX)
}

/// Flattened, read-only chunk table for one language.
#[derive(Debug, Clone)]
pub struct Corpus {
    language: Language,
    records: Vec<ChunkRecord>,
}

impl Corpus {
    pub fn load(language: Language, metadata_path: &Path, corpus_path: &Path) -> Result<Self> {
        let metadata: MetadataFile = read_json(metadata_path)?;
        let chunks: CorpusFile = if corpus_path.exists() {
            read_json(corpus_path)?
        } else {
            tracing::warn!(path = %corpus_path.display(), "corpus file missing; serving previews only");
            CorpusFile::new()
        };
        let corpus = Self::from_artifacts(language, &metadata, &chunks);
        info!(%language, rows = corpus.len(), "corpus metadata loaded");
        Ok(corpus)
    }

    pub fn from_artifacts(language: Language, metadata: &MetadataFile, chunks: &CorpusFile) -> Self {
        let mut chapters: Vec<(&String, &String, &ChapterEntry)> = metadata
            .structure()
            .iter()
            .flat_map(|(book, chapters)| chapters.iter().map(move |(chapter, entry)| (book, chapter, entry)))
            .filter(|(_, _, entry)| entry.embedding_key.is_some())
            .collect();
        let order = |entry: &ChapterEntry| entry.embedding_key.as_deref().map_or(usize::MAX, embedding_order);
        chapters.sort_by_key(|&(_, _, entry)| order(entry));

        let mut records = Vec::new();
        for (book, chapter, entry) in chapters {
            let texts = chunks.get(book).and_then(|c| c.get(chapter));
            for chunk_index in 0..entry.num_chunks {
                let preview = entry.text_previews.get(chunk_index).cloned().unwrap_or_default();
                let text = texts
                    .and_then(|t| t.get(chunk_index))
                    .filter(|t| !t.is_empty())
                    .cloned()
                    .unwrap_or_else(|| preview.clone());
                records.push(ChunkRecord {
                    row: records.len(),
                    chunk: ChunkRef { book: book.clone(), chapter: chapter.clone(), chunk_index },
                    preview,
                    text,
                });
            }
        }
        debug!(%language, rows = records.len(), "flattened metadata");
        Self { language, records }
    }

    /// Build directly from records; rows are renumbered to their position.
    pub fn from_records(language: Language, records: Vec<ChunkRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(row, mut r)| {
                r.row = row;
                r
            })
            .collect();
        Self { language, records }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, row: RowId) -> Option<&ChunkRecord> {
        self.records.get(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.iter()
    }

    /// Fail with an integrity error unless an index covers exactly these rows.
    pub fn check_aligned(&self, index_name: &str, index_rows: usize) -> Result<()> {
        if index_rows == self.len() {
            return Ok(());
        }
        Err(Error::integrity(
            self.language,
            format!("{index_name} has {index_rows} rows but metadata has {}", self.len()),
        ))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Artifact(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| Error::Artifact(format!("failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> MetadataFile {
        serde_json::from_str(
            r#"{"structure": {
                "sb": {"1.1": {"embedding_key": "embeddings_10", "num_chunks": 1, "text_previews": ["sb p0"]}},
                "bg": {
                    "2": {"embedding_key": "embeddings_2", "num_chunks": 2, "text_previews": ["bg2 p0", "bg2 p1"]},
                    "1": {"embedding_key": "embeddings_1", "num_chunks": 1, "text_previews": ["bg1 p0"]}
                }
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn rows_follow_embedding_key_order() {
        let chunks: CorpusFile = serde_json::from_str(r#"{"bg": {"2": ["full bg2 c0"]}}"#).unwrap();
        let corpus = Corpus::from_artifacts(Language::En, &metadata(), &chunks);
        let ids: Vec<(String, String, usize)> = corpus
            .iter()
            .map(|r| (r.chunk.book.clone(), r.chunk.chapter.clone(), r.chunk.chunk_index))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("bg".into(), "1".into(), 0),
                ("bg".into(), "2".into(), 0),
                ("bg".into(), "2".into(), 1),
                ("sb".into(), "1.1".into(), 0),
            ]
        );
        for (i, r) in corpus.iter().enumerate() {
            assert_eq!(r.row, i);
        }
    }

    #[test]
    fn unnumbered_chapters_keep_file_order() {
        let metadata: MetadataFile = serde_json::from_str(
            r#"{"structure": {
                "zz": {"intro": {"embedding_key": "extra", "num_chunks": 1}},
                "aa": {"2": {"embedding_key": "embeddings", "num_chunks": 1},
                       "1": {"embedding_key": "embeddings_0", "num_chunks": 1}}
            }}"#,
        )
        .unwrap();
        let corpus = Corpus::from_artifacts(Language::En, &metadata, &CorpusFile::new());
        let order: Vec<(&str, &str)> = corpus.iter().map(|r| (r.chunk.book.as_str(), r.chunk.chapter.as_str())).collect();
        assert_eq!(order, vec![("aa", "1"), ("zz", "intro"), ("aa", "2")]);
    }

    #[test]
    fn missing_text_falls_back_to_preview() {
        let chunks: CorpusFile = serde_json::from_str(r#"{"bg": {"2": ["full bg2 c0"]}}"#).unwrap();
        let corpus = Corpus::from_artifacts(Language::En, &metadata(), &chunks);
        assert_eq!(corpus.get(1).unwrap().text, "full bg2 c0");
        assert_eq!(corpus.get(2).unwrap().text, "bg2 p1");
    }

    #[test]
    fn bare_structure_is_accepted() {
        let bare: MetadataFile = serde_json::from_str(
            r#"{"bg": {"1": {"embedding_key": "embeddings_0", "num_chunks": 1}, "intro": {"num_chunks": 3}}}"#,
        )
        .unwrap();
        let corpus = Corpus::from_artifacts(Language::Ru, &bare, &CorpusFile::new());
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get(0).unwrap().text, "");
    }

    #[test]
    fn misaligned_index_is_an_integrity_error() {
        let corpus = Corpus::from_artifacts(Language::En, &metadata(), &CorpusFile::new());
        assert!(corpus.check_aligned("keyword index", 4).is_ok());
        let err = corpus.check_aligned("vector index", 3).unwrap_err();
        assert!(matches!(err, Error::Integrity { language: Language::En, .. }));
    }

    #[test]
    fn load_reads_files_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let meta_path = tmp.path().join("metadata_en.json");
        let corpus_path = tmp.path().join("corpus_en.json");
        std::fs::write(&meta_path, r#"{"structure": {"bg": {"2": {"embedding_key": "embeddings_0", "num_chunks": 1, "text_previews": ["p"]}}}}"#).unwrap();
        std::fs::write(&corpus_path, r#"{"bg": {"2": ["TEXT 5. full"]}}"#).unwrap();
        let corpus = Corpus::load(Language::En, &meta_path, &corpus_path).expect("load");
        assert_eq!(corpus.get(0).unwrap().text, "TEXT 5. full");

        std::fs::write(&meta_path, "{not json").unwrap();
        assert!(matches!(Corpus::load(Language::En, &meta_path, &corpus_path), Err(Error::Artifact(_))));
    }
}
