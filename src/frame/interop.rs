use crate::error::ConversionError;
use arrow::array::RecordBatch;

use super::Frame;

/// Lossless conversion into an Arrow [`RecordBatch`].
///
/// This is the hand-off point to other dataframe libraries: column names,
/// types and values survive unchanged.
pub trait ToTabular {
    /// Convert into a record batch.
    fn to_record_batch(&self) -> Result<RecordBatch, ConversionError>;
}

impl ToTabular for Frame {
    fn to_record_batch(&self) -> Result<RecordBatch, ConversionError> {
        Ok(self.record_batch().clone())
    }
}

impl ToTabular for RecordBatch {
    fn to_record_batch(&self) -> Result<RecordBatch, ConversionError> {
        Ok(self.clone())
    }
}
