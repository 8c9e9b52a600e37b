use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument, Term};
use tracing::{debug, info};

use shuka_core::traits::KeywordIndex;
use shuka_core::{Corpus, Error, Language, RowId};

use crate::normalizer::{build_schema, normalize, register_tokenizer, ROW_FIELD, TEXT_FIELD};

/// Read-only BM25 index whose documents carry the aligned row id.
pub struct TantivyKeywordIndex {
	reader: IndexReader,
	language: Language,
	row_field: Field,
	text_field: Field,
	rows: usize,
}

impl TantivyKeywordIndex {
	/// Open `dir` and verify it covers exactly the rows of `corpus`.
	pub fn open(dir: &Path, corpus: &Corpus) -> shuka_core::Result<Self> {
		let artifact = |e: tantivy::TantivyError| Error::Artifact(format!("keyword index {}: {e}", dir.display()));
		let index = Index::open_in_dir(dir).map_err(artifact)?;
		let keywords = Self::from_index(index, corpus.language()).map_err(artifact)?;
		corpus.check_aligned("keyword index", keywords.rows)?;
		keywords.verify_row_ids()?;
		info!(language = %corpus.language(), rows = keywords.rows, "keyword index loaded");
		Ok(keywords)
	}

	fn from_index(index: Index, language: Language) -> tantivy::Result<Self> {
		register_tokenizer(&index, language);
		let schema = index.schema();
		let row_field = schema.get_field(ROW_FIELD)?;
		let text_field = schema.get_field(TEXT_FIELD)?;
		let reader = index.reader()?;
		let rows = reader.searcher().num_docs() as usize;
		Ok(Self { reader, language, row_field, text_field, rows })
	}

	/// Every stored row id must appear once and the set must be `0..rows`.
	fn verify_row_ids(&self) -> shuka_core::Result<()> {
		let searcher = self.reader.searcher();
		let integrity = |detail: String| Error::integrity(self.language, detail);
		let addrs = searcher.search(&AllQuery, &DocSetCollector).map_err(|e| integrity(e.to_string()))?;
		let mut seen = HashSet::with_capacity(addrs.len());
		for addr in addrs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(|e| integrity(e.to_string()))?;
			let row = doc.get_first(self.row_field).and_then(|v| v.as_u64()).ok_or_else(|| integrity("keyword document without row id".into()))?;
			if row as usize >= self.rows || !seen.insert(row) {
				return Err(integrity(format!("keyword row id {row} is duplicated or out of range")));
			}
		}
		Ok(())
	}

	fn rows_for(&self, query: &dyn Query, k: usize) -> Result<Vec<(RowId, f32)>> {
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(query, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			if let Some(row) = doc.get_first(self.row_field).and_then(|v| v.as_u64()) { hits.push((row as RowId, score)); }
		}
		Ok(hits)
	}
}

impl KeywordIndex for TantivyKeywordIndex {
	fn len(&self) -> usize { self.rows }

	fn search(&self, query: &str, k: usize) -> Result<Vec<(RowId, f32)>> {
		let tokens = normalize(query, self.language);
		if tokens.is_empty() || k == 0 { return Ok(vec![]); }
		debug!(?tokens, k, "keyword query");
		let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.text_field, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		self.rows_for(&BooleanQuery::new(clauses), k)
	}
}

/// Writes chunk texts in row order; the n-th `add` becomes row n.
pub struct KeywordIndexBuilder {
	index: Index,
	writer: IndexWriter,
	language: Language,
	row_field: Field,
	text_field: Field,
	next_row: RowId,
}

impl KeywordIndexBuilder {
	/// Create a fresh index in `dir`, replacing any previous one.
	pub fn create_in_dir(dir: &Path, language: Language) -> Result<Self> {
		if dir.exists() { std::fs::remove_dir_all(dir)?; }
		std::fs::create_dir_all(dir)?;
		Self::with_index(Index::create_in_dir(dir, build_schema(language))?, language)
	}

	pub fn create_in_ram(language: Language) -> Result<Self> {
		Self::with_index(Index::create_in_ram(build_schema(language)), language)
	}

	fn with_index(index: Index, language: Language) -> Result<Self> {
		register_tokenizer(&index, language);
		let schema = index.schema();
		let row_field = schema.get_field(ROW_FIELD)?;
		let text_field = schema.get_field(TEXT_FIELD)?;
		let writer = index.writer(50_000_000)?;
		Ok(Self { index, writer, language, row_field, text_field, next_row: 0 })
	}

	pub fn add(&mut self, text: &str) -> Result<RowId> {
		let row = self.next_row;
		self.writer.add_document(doc!(self.row_field => row as u64, self.text_field => text.to_string()))?;
		self.next_row += 1;
		Ok(row)
	}

	pub fn finish(mut self) -> Result<TantivyKeywordIndex> {
		self.writer.commit()?;
		self.writer.wait_merging_threads()?;
		let keywords = TantivyKeywordIndex::from_index(self.index, self.language)?;
		info!(language = %self.language, rows = keywords.rows, "keyword index built");
		Ok(keywords)
	}
}

/// Build an in-memory index over every row of `corpus`.
pub fn index_corpus_in_ram(corpus: &Corpus) -> Result<TantivyKeywordIndex> {
	let mut builder = KeywordIndexBuilder::create_in_ram(corpus.language())?;
	for record in corpus.iter() { builder.add(&record.text)?; }
	builder.finish()
}
