//! Array builders for converting JSON values to Arrow arrays.
//!
//! Each builder reads one column out of row-major JSON rows and produces a
//! typed Arrow array with proper NULL handling.

use crate::error::ConversionError;
use crate::types::SqlType;
use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Decimal128Builder, Float64Builder, Int64Builder,
    StringBuilder, TimestampMicrosecondBuilder,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::sync::Arc;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Build an Arrow array for column `column` of `rows`.
///
/// # Errors
/// Returns `ConversionError` if a value does not match the column type.
pub fn build_array(
    sql_type: &SqlType,
    rows: &[Vec<Value>],
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let values = rows.iter().map(|row| &row[column]);
    match sql_type {
        SqlType::Boolean => build_boolean_array(values, rows.len(), column),
        SqlType::Text { .. } => build_string_array(values, rows.len(), column),
        SqlType::Decimal { precision, scale } => {
            if matches!(
                crate::types::TypeMapper::to_arrow(sql_type),
                arrow_schema::DataType::Int64
            ) {
                build_int64_array(values, rows.len(), column)
            } else {
                build_decimal128_array(values, rows.len(), *precision, *scale, column)
            }
        }
        SqlType::Double => build_double_array(values, rows.len(), column),
        SqlType::Date => build_date_array(values, rows.len(), column),
        SqlType::Timestamp {
            with_local_time_zone,
        } => build_timestamp_array(values, rows.len(), *with_local_time_zone, column),
    }
}

fn conversion_failed(row: usize, column: usize, message: String) -> ConversionError {
    ConversionError::ValueConversionFailed {
        row,
        column,
        message,
    }
}

fn build_boolean_array<'a>(
    values: impl Iterator<Item = &'a Value>,
    len: usize,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let mut builder = BooleanBuilder::with_capacity(len);

    for (row, value) in values.enumerate() {
        if value.is_null() {
            builder.append_null();
        } else if let Some(b) = value.as_bool() {
            builder.append_value(b);
        } else {
            return Err(conversion_failed(
                row,
                column,
                format!("Expected boolean, got: {}", value),
            ));
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_string_array<'a>(
    values: impl Iterator<Item = &'a Value>,
    len: usize,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let mut builder = StringBuilder::with_capacity(len, len * 16);

    for (row, value) in values.enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::String(s) => builder.append_value(s),
            other => {
                return Err(conversion_failed(
                    row,
                    column,
                    format!("Expected string, got: {}", other),
                ))
            }
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_int64_array<'a>(
    values: impl Iterator<Item = &'a Value>,
    len: usize,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let mut builder = Int64Builder::with_capacity(len);

    for (row, value) in values.enumerate() {
        if value.is_null() {
            builder.append_null();
            continue;
        }
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match parsed {
            Some(i) => builder.append_value(i),
            None => {
                return Err(conversion_failed(
                    row,
                    column,
                    format!("Expected integer, got: {}", value),
                ))
            }
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_decimal128_array<'a>(
    values: impl Iterator<Item = &'a Value>,
    len: usize,
    precision: u8,
    scale: i8,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let mut builder = Decimal128Builder::with_capacity(len)
        .with_precision_and_scale(precision, scale)?;

    for (row, value) in values.enumerate() {
        let text = match value {
            Value::Null => {
                builder.append_null();
                continue;
            }
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(conversion_failed(
                    row,
                    column,
                    format!("Expected numeric value, got: {}", other),
                ))
            }
        };
        builder.append_value(parse_decimal(&text, precision, scale, row, column)?);
    }

    Ok(Arc::new(builder.finish()))
}

/// Parse decimal text into an unscaled integer with `scale` fractional digits.
///
/// Fractional digits beyond `scale` are accepted only when they are zeros.
fn parse_decimal(
    text: &str,
    precision: u8,
    scale: i8,
    row: usize,
    column: usize,
) -> Result<i128, ConversionError> {
    let invalid = || conversion_failed(row, column, format!("Invalid decimal: {}", text));

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(invalid());
    }

    let scale = scale.max(0) as usize;
    let frac_part = if frac_part.len() > scale {
        let (kept, dropped) = frac_part.split_at(scale);
        if dropped.bytes().any(|b| b != b'0') {
            return Err(conversion_failed(
                row,
                column,
                format!("{} has more than {} fractional digits", text, scale),
            ));
        }
        kept
    } else {
        frac_part
    };

    let mut digits = String::with_capacity(int_part.len() + scale);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.extend(std::iter::repeat('0').take(scale - frac_part.len()));

    let significant = digits.trim_start_matches('0');
    if significant.len() > precision as usize {
        return Err(ConversionError::NumericOverflow { row, column });
    }

    let magnitude: i128 = if significant.is_empty() {
        0
    } else {
        significant
            .parse()
            .map_err(|_| ConversionError::NumericOverflow { row, column })?
    };

    Ok(if negative { -magnitude } else { magnitude })
}

fn build_double_array<'a>(
    values: impl Iterator<Item = &'a Value>,
    len: usize,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let mut builder = Float64Builder::with_capacity(len);

    for (row, value) in values.enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::Number(n) => match n.as_f64() {
                Some(f) => builder.append_value(f),
                None => {
                    return Err(conversion_failed(
                        row,
                        column,
                        format!("Number out of range: {}", n),
                    ))
                }
            },
            Value::String(s) => {
                let f = match s.as_str() {
                    "Infinity" => f64::INFINITY,
                    "-Infinity" => f64::NEG_INFINITY,
                    "NaN" => f64::NAN,
                    other => other.parse::<f64>().map_err(|_| {
                        conversion_failed(row, column, format!("Invalid float value: {}", other))
                    })?,
                };
                builder.append_value(f);
            }
            other => {
                return Err(conversion_failed(
                    row,
                    column,
                    format!("Expected number, got: {}", other),
                ))
            }
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn build_date_array<'a>(
    values: impl Iterator<Item = &'a Value>,
    len: usize,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let mut builder = Date32Builder::with_capacity(len);
    let epoch = unix_epoch();

    for (row, value) in values.enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::String(s) => {
                // Accept a trailing time part, which some sources attach to DATE.
                let date_part = s.split([' ', 'T']).next().unwrap_or(s);
                let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
                    conversion_failed(row, column, format!("Invalid date '{}': {}", s, e))
                })?;
                builder.append_value((date - epoch).num_days() as i32);
            }
            other => {
                return Err(conversion_failed(
                    row,
                    column,
                    format!("Expected date string, got: {}", other),
                ))
            }
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn build_timestamp_array<'a>(
    values: impl Iterator<Item = &'a Value>,
    len: usize,
    with_local_time_zone: bool,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let tz = with_local_time_zone.then_some("UTC");
    let mut builder = TimestampMicrosecondBuilder::with_capacity(len).with_timezone_opt(tz);

    for (row, value) in values.enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::String(s) => {
                let ts = parse_timestamp(s).ok_or_else(|| {
                    conversion_failed(row, column, format!("Invalid timestamp: {}", s))
                })?;
                builder.append_value(ts.and_utc().timestamp_micros());
            }
            other => {
                return Err(conversion_failed(
                    row,
                    column,
                    format!("Expected timestamp string, got: {}", other),
                ))
            }
        }
    }

    Ok(Arc::new(builder.finish()))
}
