use crate::error::ConversionError;
use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use std::sync::Arc;

use super::Frame;

/// Reassembles batch chunks into one frame.
///
/// Chunks are kept in arrival order and concatenated once in
/// [`finish`](Self::finish), so total cost is linear in the number of rows.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    schema: Option<SchemaRef>,
    chunks: Vec<RecordBatch>,
    num_rows: usize,
}

impl FrameAccumulator {
    /// Accumulator whose schema is taken from the first chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator with a known schema, so zero chunks still finish into an
    /// empty frame with the right columns.
    pub fn with_schema(schema: SchemaRef) -> Self {
        Self {
            schema: Some(schema),
            ..Self::default()
        }
    }

    /// Append a chunk.
    ///
    /// # Errors
    /// Returns `ConversionError::SchemaMismatch` if the chunk's columns differ
    /// from the accumulated ones.
    pub fn push(&mut self, chunk: Frame) -> Result<(), ConversionError> {
        let chunk_schema = chunk.schema();
        match &self.schema {
            Some(schema) if schema.as_ref() != chunk_schema.as_ref() => {
                return Err(ConversionError::SchemaMismatch(format!(
                    "chunk {} has columns {:?}, expected {:?}",
                    self.chunks.len(),
                    chunk.column_names(),
                    schema
                        .fields()
                        .iter()
                        .map(|f| f.name().as_str())
                        .collect::<Vec<_>>()
                )));
            }
            Some(_) => {}
            None => self.schema = Some(chunk_schema),
        }

        self.num_rows += chunk.num_rows();
        self.chunks.push(chunk.into_record_batch());
        Ok(())
    }

    /// Number of chunks pushed so far.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Number of rows pushed so far.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Concatenate every chunk in order.
    pub fn finish(self) -> Result<Frame, ConversionError> {
        let schema = self.schema.unwrap_or_else(|| Arc::new(Schema::empty()));

        if self.chunks.is_empty() {
            return Ok(Frame::empty(schema));
        }
        Ok(Frame::new(concat_batches(&schema, &self.chunks)?))
    }
}
