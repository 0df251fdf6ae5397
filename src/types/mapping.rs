//! Type mapping between source column types and Apache Arrow data types.

use crate::error::ConversionError;
use crate::transport::messages::DataType as WireType;
use arrow_schema::{DataType, TimeUnit};

/// Largest precision whose integral DECIMAL values fit an `i64`.
const MAX_INT64_PRECISION: u8 = 18;

/// Largest precision Arrow's Decimal128 accepts.
const MAX_DECIMAL128_PRECISION: u8 = 38;

/// Column type as reported by the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    /// BOOLEAN
    Boolean,
    /// CHAR(n) / VARCHAR(n)
    Text { size: Option<usize> },
    /// DECIMAL(p, s), NUMBER(p, s), INTEGER, BIGINT
    Decimal { precision: u8, scale: i8 },
    /// DOUBLE / FLOAT, and NUMBER without precision or scale
    Double,
    /// DATE
    Date,
    /// TIMESTAMP [WITH LOCAL TIME ZONE]
    Timestamp { with_local_time_zone: bool },
}

impl SqlType {
    /// Parse the wire description of a column type.
    ///
    /// # Errors
    /// Returns `ConversionError::UnsupportedType` for unknown type names.
    pub fn from_wire(data_type: &WireType) -> Result<Self, ConversionError> {
        let name = data_type.type_name.trim().to_ascii_uppercase();
        match name.as_str() {
            "BOOLEAN" | "BOOL" => Ok(SqlType::Boolean),
            "CHAR" | "VARCHAR" | "VARCHAR2" | "NVARCHAR" | "TEXT" => Ok(SqlType::Text {
                size: data_type.size.map(|s| s.max(0) as usize),
            }),
            // Unconstrained numerics may hold any fraction
            "DECIMAL" | "NUMBER" | "NUMERIC"
                if data_type.precision.is_none() && data_type.scale.is_none() =>
            {
                Ok(SqlType::Double)
            }
            "DECIMAL" | "NUMBER" | "NUMERIC" => {
                let precision = data_type.precision.unwrap_or(MAX_DECIMAL128_PRECISION as i32);
                let scale = data_type.scale.unwrap_or(0);
                if !(1..=MAX_DECIMAL128_PRECISION as i32).contains(&precision)
                    || !(0..=precision).contains(&scale)
                {
                    return Err(ConversionError::UnsupportedType {
                        type_name: format!("{}({}, {})", name, precision, scale),
                    });
                }
                Ok(SqlType::Decimal {
                    precision: precision as u8,
                    scale: scale as i8,
                })
            }
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" => Ok(SqlType::Decimal {
                precision: MAX_INT64_PRECISION,
                scale: 0,
            }),
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "REAL" => Ok(SqlType::Double),
            "DATE" => Ok(SqlType::Date),
            "TIMESTAMP" => Ok(SqlType::Timestamp {
                with_local_time_zone: data_type.with_local_time_zone.unwrap_or(false),
            }),
            _ => Err(ConversionError::UnsupportedType {
                type_name: data_type.type_name.clone(),
            }),
        }
    }
}

/// Type mapper for converting source types to Arrow types.
pub struct TypeMapper;

impl TypeMapper {
    /// Convert a source type to an Arrow DataType.
    ///
    /// Integral decimals that fit 64 bits become `Int64`; other decimals keep
    /// their exact precision and scale as `Decimal128`, so no numeric column
    /// loses precision.
    pub fn to_arrow(sql_type: &SqlType) -> DataType {
        match sql_type {
            SqlType::Boolean => DataType::Boolean,
            SqlType::Text { .. } => DataType::Utf8,
            SqlType::Decimal { precision, scale } => {
                if *scale == 0 && *precision <= MAX_INT64_PRECISION {
                    DataType::Int64
                } else {
                    DataType::Decimal128(*precision, *scale)
                }
            }
            SqlType::Double => DataType::Float64,
            SqlType::Date => DataType::Date32,
            SqlType::Timestamp {
                with_local_time_zone,
            } => {
                let tz = with_local_time_zone.then(|| "UTC".into());
                DataType::Timestamp(TimeUnit::Microsecond, tz)
            }
        }
    }
}
