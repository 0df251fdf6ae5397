//! Quick-look helpers for interactive inspection of a [`Frame`].

use crate::error::ConversionError;
use arrow::array::{Array, ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::util::display::array_value_to_string;
use std::sync::Arc;

use super::Frame;

/// Row labels of [`Frame::describe`].
pub const STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

impl Frame {
    /// The first `n` rows (all rows if fewer).
    pub fn head(&self, n: usize) -> Frame {
        self.slice(0, n.min(self.num_rows()))
    }

    /// The last `n` rows (all rows if fewer).
    pub fn tail(&self, n: usize) -> Frame {
        let len = n.min(self.num_rows());
        self.slice(self.num_rows() - len, len)
    }

    /// Summary statistics of the numeric columns.
    ///
    /// The result has a `statistic` column labelled with [`STATISTICS`] and
    /// one `Float64` column per numeric input column. Nulls are skipped;
    /// `std` is the sample standard deviation and quantiles interpolate
    /// linearly. Statistics that are undefined for the column's values are
    /// null.
    pub fn describe(&self) -> Result<Frame, ConversionError> {
        let mut fields = vec![Field::new("statistic", DataType::Utf8, false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(STATISTICS.to_vec()))];

        let schema = self.schema();
        for (field, column) in schema.fields().iter().zip(self.record_batch().columns()) {
            if !field.data_type().is_numeric() {
                continue;
            }

            let as_float = cast(column, &DataType::Float64)?;
            let values = as_float
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    ConversionError::ArrowError(format!(
                        "column '{}' did not cast to Float64",
                        field.name()
                    ))
                })?;

            let mut sorted: Vec<f64> = values.iter().flatten().filter(|v| !v.is_nan()).collect();
            sorted.sort_by(|a, b| a.total_cmp(b));

            fields.push(Field::new(field.name(), DataType::Float64, true));
            columns.push(Arc::new(Float64Array::from(summarize(&sorted).to_vec())));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Frame::new(batch))
    }

    /// Swap rows and columns.
    ///
    /// The first column, `column`, holds the original column names; each
    /// original row becomes a `Utf8` column named by its position.
    pub fn transpose(&self) -> Result<Frame, ConversionError> {
        let mut fields = vec![Field::new("column", DataType::Utf8, false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(self.column_names()))];

        let source = self.record_batch().columns();
        for row in 0..self.num_rows() {
            let values = source
                .iter()
                .map(|column| {
                    if column.is_null(row) {
                        Ok(None)
                    } else {
                        array_value_to_string(column, row).map(Some)
                    }
                })
                .collect::<Result<Vec<Option<String>>, _>>()?;

            fields.push(Field::new(row.to_string(), DataType::Utf8, true));
            columns.push(Arc::new(StringArray::from(values)));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Frame::new(batch))
    }
}

/// Statistics over non-null values sorted ascending.
fn summarize(sorted: &[f64]) -> [Option<f64>; 8] {
    let n = sorted.len();
    if n == 0 {
        return [Some(0.0), None, None, None, None, None, None, None];
    }

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let sum_sq: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n - 1) as f64).sqrt()
    });

    [
        Some(n as f64),
        Some(mean),
        std,
        Some(sorted[0]),
        Some(quantile(sorted, 0.25)),
        Some(quantile(sorted, 0.5)),
        Some(quantile(sorted, 0.75)),
        Some(sorted[n - 1]),
    ]
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
