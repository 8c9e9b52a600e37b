use anyhow::{bail, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, UInt64Array};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use shuka_core::RowId;
use shuka_embed::l2_normalize;

use crate::schema::build_arrow_schema;
use crate::table::{open_db, table_exists};

/// Appends normalized vectors to a per-language table; the n-th vector written becomes row n.
pub struct LanceVectorWriter { db: Connection, table_name: String, dim: usize, next_row: RowId }

impl LanceVectorWriter {
	/// Fails if the table already exists, so rows always start at zero.
	pub async fn create(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		if table_exists(&db, table_name).await? { bail!("vector table {table_name} already exists"); }
		Ok(Self { db, table_name: table_name.to_string(), dim, next_row: 0 })
	}

	pub async fn write(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
		if vectors.is_empty() { return Ok(()); }
		let pb = ProgressBar::new(vectors.len() as u64);
		pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} vectors ({percent}%)")?.progress_chars("#>-"));
		for batch in vectors.chunks(1000) {
			self.insert_batch(batch).await?;
			pb.inc(batch.len() as u64);
		}
		pb.finish_and_clear();
		info!(table = %self.table_name, rows = self.next_row, "vectors written");
		Ok(())
	}

	async fn insert_batch(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
		let record_batch = self.to_record_batch(vectors)?;
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if table_exists(&self.db, &self.table_name).await? {
			self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
		} else {
			self.db.create_table(&self.table_name, reader).execute().await?;
		}
		self.next_row += vectors.len();
		Ok(())
	}

	fn to_record_batch(&self, vectors: &[Vec<f32>]) -> Result<RecordBatch> {
		let rows: Vec<u64> = (self.next_row..self.next_row + vectors.len()).map(|r| r as u64).collect();
		let mut values: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(vectors.len());
		for v in vectors {
			if v.len() != self.dim { bail!("vector has {} dims, table expects {}", v.len(), self.dim); }
			let mut v = v.clone();
			l2_normalize(&mut v);
			values.push(Some(v.into_iter().map(Some).collect()));
		}
		let dim = i32::try_from(self.dim)?;
		Ok(RecordBatch::try_new(build_arrow_schema(dim), vec![
			Arc::new(UInt64Array::from(rows)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(values.into_iter(), dim)),
		])?)
	}
}
