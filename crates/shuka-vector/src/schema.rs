use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ROW_COLUMN: &str = "row";
pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

/// One row per chunk: aligned row id plus its L2-normalized embedding.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ROW_COLUMN, DataType::UInt64, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Dimension of the vector column, if the schema has a fixed-size one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(_, dim) => usize::try_from(*dim).ok(),
		_ => None,
	}
}
