use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::SchemaRef;
use arrow::util::pretty::pretty_format_batches;
use std::fmt;

/// An in-memory table of named, typed, equal-length columns.
///
/// Backed by a single Arrow [`RecordBatch`]. Row positions are contiguous
/// from zero; frames built by concatenation carry no per-chunk index.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    batch: RecordBatch,
}

impl Frame {
    /// Wrap a record batch.
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// A frame with the given columns and no rows.
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            batch: RecordBatch::new_empty(schema),
        }
    }

    /// Column names and types.
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    /// True if the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Rows `offset..offset + length` as a new frame (zero-copy).
    ///
    /// # Panics
    /// Panics if the range exceeds the frame, like [`RecordBatch::slice`].
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        Self {
            batch: self.batch.slice(offset, length),
        }
    }

    /// Borrow the underlying record batch.
    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Unwrap into the underlying record batch.
    pub fn into_record_batch(self) -> RecordBatch {
        self.batch
    }
}

impl From<RecordBatch> for Frame {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}

impl From<Frame> for RecordBatch {
    fn from(frame: Frame) -> Self {
        frame.batch
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table =
            pretty_format_batches(std::slice::from_ref(&self.batch)).map_err(|_| fmt::Error)?;
        writeln!(f, "{}", table)?;
        write!(f, "[{} rows x {} columns]", self.num_rows(), self.num_columns())
    }
}
