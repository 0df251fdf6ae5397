//! Per-call fetch options and bind parameters.

use crate::error::ValidationError;
use serde_json::Value;

/// A positional bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Parameter {
    /// Wire representation.
    ///
    /// # Errors
    /// Non-finite floats have no JSON representation.
    pub fn to_json(&self, index: usize) -> Result<Value, ValidationError> {
        match self {
            Parameter::Null => Ok(Value::Null),
            Parameter::Boolean(b) => Ok(Value::Bool(*b)),
            Parameter::Integer(i) => Ok(Value::from(*i)),
            Parameter::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| ValidationError::InvalidParameter {
                    index,
                    message: format!("{} is not a finite number", f),
                }),
            Parameter::String(s) => Ok(Value::String(s.clone())),
        }
    }
}

impl From<bool> for Parameter {
    fn from(value: bool) -> Self {
        Parameter::Boolean(value)
    }
}

impl From<i32> for Parameter {
    fn from(value: i32) -> Self {
        Parameter::Integer(i64::from(value))
    }
}

impl From<i64> for Parameter {
    fn from(value: i64) -> Self {
        Parameter::Integer(value)
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Parameter::Float(value)
    }
}

impl From<&str> for Parameter {
    fn from(value: &str) -> Self {
        Parameter::String(value.to_string())
    }
}

impl From<String> for Parameter {
    fn from(value: String) -> Self {
        Parameter::String(value)
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(value: Option<T>) -> Self {
        value.map_or(Parameter::Null, Into::into)
    }
}

/// Options for one fetch call.
///
/// # Example
///
/// ```
/// use framefetch::FetchOptions;
///
/// let options = FetchOptions::new()
///     .arraysize(500)
///     .batch_size(10)
///     .bind(42)
///     .bind("active");
/// assert_eq!(options.get_batch_size(), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    arraysize: Option<usize>,
    batch_size: Option<usize>,
    parameters: Vec<Parameter>,
}

impl FetchOptions {
    /// Options with every value defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows transferred per round trip. Defaults to the connection's
    /// `default_arraysize`.
    pub fn arraysize(mut self, arraysize: usize) -> Self {
        self.arraysize = Some(arraysize);
        self
    }

    /// Maximum rows per chunk for batch fetches. Without it a batch fetch
    /// yields the whole result as one chunk.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Replace the bind parameters.
    pub fn parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Append one bind parameter.
    pub fn bind(mut self, parameter: impl Into<Parameter>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn get_arraysize(&self) -> Option<usize> {
        self.arraysize
    }

    pub fn get_batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    pub fn get_parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Effective arraysize, rejecting zero.
    pub(crate) fn resolve_arraysize(&self, default: usize) -> Result<usize, ValidationError> {
        positive("arraysize", self.arraysize.unwrap_or(default))
    }

    /// Batch size, rejecting zero.
    pub(crate) fn resolve_batch_size(&self) -> Result<Option<usize>, ValidationError> {
        self.batch_size
            .map(|size| positive("batch_size", size))
            .transpose()
    }

    /// Bind parameters in wire form.
    pub(crate) fn wire_parameters(&self) -> Result<Vec<Value>, ValidationError> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(index, p)| p.to_json(index))
            .collect()
    }
}

fn positive(parameter: &'static str, value: usize) -> Result<usize, ValidationError> {
    if value == 0 {
        return Err(ValidationError::NonPositiveSize {
            parameter,
            value: 0,
        });
    }
    Ok(value)
}
