//! Converter from row-major JSON result pages to Arrow `RecordBatch`es.

use crate::error::ConversionError;
use crate::transport::messages::ColumnInfo;
use crate::types::{SqlType, TypeMapper};
use arrow::array::RecordBatch;
use arrow::datatypes::{Field, Schema, SchemaRef};
use serde_json::Value;
use std::sync::Arc;

use super::builders::build_array;

/// Converts result pages of one statement into record batches.
///
/// Built once from the column metadata of the execute response and reused for
/// every page, so all batches of a result share one schema.
#[derive(Debug, Clone)]
pub struct ArrowConverter {
    schema: SchemaRef,
    column_types: Vec<SqlType>,
}

impl ArrowConverter {
    /// Create a converter from column metadata.
    ///
    /// # Errors
    /// Returns `ConversionError::UnsupportedType` if a column type has no
    /// Arrow mapping.
    pub fn new(columns: &[ColumnInfo]) -> Result<Self, ConversionError> {
        let column_types = columns
            .iter()
            .map(|col| SqlType::from_wire(&col.data_type))
            .collect::<Result<Vec<_>, _>>()?;

        let fields: Vec<Field> = columns
            .iter()
            .zip(&column_types)
            .map(|(col, sql_type)| Field::new(&col.name, TypeMapper::to_arrow(sql_type), true))
            .collect();

        Ok(Self {
            schema: Arc::new(Schema::new(fields)),
            column_types,
        })
    }

    /// Get the Arrow schema.
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Convert row-major rows into a record batch.
    ///
    /// # Errors
    /// Returns `ConversionError::SchemaMismatch` if a row has the wrong width,
    /// or a value-level error if a value does not fit its column type.
    pub fn convert(&self, rows: &[Vec<Value>]) -> Result<RecordBatch, ConversionError> {
        if rows.is_empty() {
            return Ok(RecordBatch::new_empty(self.schema()));
        }

        let num_columns = self.column_types.len();
        if let Some((row_idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != num_columns)
        {
            return Err(ConversionError::SchemaMismatch(format!(
                "Row {} has {} columns, expected {}",
                row_idx,
                row.len(),
                num_columns
            )));
        }

        let arrays = self
            .column_types
            .iter()
            .enumerate()
            .map(|(col_idx, sql_type)| build_array(sql_type, rows, col_idx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordBatch::try_new(self.schema(), arrays)?)
    }
}
