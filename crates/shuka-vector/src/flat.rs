use anyhow::{bail, Result};
use futures::future::BoxFuture;

use shuka_core::traits::{Neighbor, VectorIndex};
use shuka_embed::l2_normalize;

/// Brute-force in-memory index; row `i` is the `i`-th vector given.
pub struct FlatVectorIndex { vectors: Vec<Vec<f32>>, dim: usize }

impl FlatVectorIndex {
	pub fn new(dim: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
		let mut normalized = Vec::with_capacity(vectors.len());
		for (row, mut v) in vectors.into_iter().enumerate() {
			if v.len() != dim { bail!("row {row} has {} dims, expected {dim}", v.len()); }
			l2_normalize(&mut v);
			normalized.push(v);
		}
		Ok(Self { vectors: normalized, dim })
	}

	/// Squared L2 distances, nearest first.
	pub fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
		let mut all: Vec<Neighbor> = self
			.vectors
			.iter()
			.enumerate()
			.map(|(row, v)| Neighbor { row, distance: v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum() })
			.collect();
		all.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
		all.truncate(k);
		all
	}
}

impl VectorIndex for FlatVectorIndex {
	fn len(&self) -> usize { self.vectors.len() }
	fn dim(&self) -> usize { self.dim }
	fn search<'a>(&'a self, query: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<Neighbor>>> {
		Box::pin(async move { Ok(self.nearest(query, k)) })
	}
}
