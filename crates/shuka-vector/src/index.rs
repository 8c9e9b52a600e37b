use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, UInt64Array};
use futures::future::BoxFuture;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use shuka_core::traits::{Neighbor, VectorIndex};
use shuka_core::{Corpus, Error, RowId};

use crate::schema::{vector_dim, DISTANCE_COLUMN, ROW_COLUMN, VECTOR_COLUMN};
use crate::table::open_db;

/// Read-only LanceDB table of `(row, vector)` searched by exact L2.
pub struct LanceVectorIndex { table: Table, rows: usize, dim: usize }

impl LanceVectorIndex {
	/// Open `table_name` under `db_path` and verify it matches `corpus` row for row
	/// and carries `dim`-dimensional vectors.
	pub async fn open(db_path: &Path, table_name: &str, corpus: &Corpus, dim: usize) -> shuka_core::Result<Self> {
		let language = corpus.language();
		let artifact = |e: anyhow::Error| Error::Artifact(format!("vector table {table_name}: {e}"));
		let db = open_db(db_path.to_string_lossy().as_ref()).await.map_err(artifact)?;
		let table = db.open_table(table_name).execute().await.map_err(|e| artifact(e.into()))?;
		let rows = table.count_rows(None).await.map_err(|e| artifact(e.into()))?;
		corpus.check_aligned("vector index", rows)?;

		let schema = table.schema().await.map_err(|e| artifact(e.into()))?;
		match vector_dim(&schema) {
			Some(d) if d == dim => {}
			Some(d) => return Err(Error::integrity(language, format!("vector dimension {d} does not match configured {dim}"))),
			None => return Err(Error::integrity(language, "vector column missing or not fixed-size")),
		}

		let index = Self { table, rows, dim };
		index.verify_row_ids().await.map_err(|e| Error::integrity(language, e.to_string()))?;
		info!(%language, rows, dim, "vector index loaded");
		Ok(index)
	}

	/// Every row id appears once and the set is `0..rows`.
	async fn verify_row_ids(&self) -> Result<()> {
		let mut stream = self.table.query().select(Select::columns(&[ROW_COLUMN])).execute().await?;
		let mut seen = HashSet::with_capacity(self.rows);
		while let Some(batch) = stream.try_next().await? {
			for row in row_column(&batch)?.iter().flatten() {
				if row as usize >= self.rows || !seen.insert(row) { return Err(anyhow!("vector row id {row} is duplicated or out of range")); }
			}
		}
		if seen.len() != self.rows { return Err(anyhow!("vector table has {} row ids for {} rows", seen.len(), self.rows)); }
		Ok(())
	}

	async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
		if k == 0 { return Ok(vec![]); }
		let mut stream = self
			.table
			.vector_search(query.to_vec())?
			.column(VECTOR_COLUMN)
			.distance_type(DistanceType::L2)
			.select(Select::columns(&[ROW_COLUMN]))
			.limit(k)
			.execute()
			.await?;
		let mut out = Vec::with_capacity(k);
		while let Some(batch) = stream.try_next().await? {
			let rows = row_column(&batch)?;
			let distances = batch
				.column_by_name(DISTANCE_COLUMN)
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| anyhow!("search result has no {DISTANCE_COLUMN} column"))?;
			for i in 0..batch.num_rows() {
				if rows.is_valid(i) { out.push(Neighbor { row: rows.value(i) as RowId, distance: distances.value(i) }); }
			}
		}
		out.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
		debug!(k, hits = out.len(), "vector search");
		Ok(out)
	}
}

fn row_column(batch: &RecordBatch) -> Result<&UInt64Array> {
	batch
		.column_by_name(ROW_COLUMN)
		.and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
		.ok_or_else(|| anyhow!("batch has no {ROW_COLUMN} column"))
}

impl VectorIndex for LanceVectorIndex {
	fn len(&self) -> usize { self.rows }
	fn dim(&self) -> usize { self.dim }
	fn search<'a>(&'a self, query: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<Neighbor>>> { Box::pin(self.nearest(query, k)) }
}
