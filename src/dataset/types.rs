//! Array and variable types
//!
//! A `Variable` is an N-dimensional array labelled with the names of the
//! dimensions it spans. `ArrayData` carries the element type.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayD, Axis, Slice};
use std::ops::Range;

/// Applies `$body` to the inner array of every variant and rewraps the result
/// in the same variant.
macro_rules! map_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            ArrayData::Float64($arr) => ArrayData::Float64($body),
            ArrayData::Float32($arr) => ArrayData::Float32($body),
            ArrayData::Int64($arr) => ArrayData::Int64($body),
            ArrayData::UInt64($arr) => ArrayData::UInt64($body),
            ArrayData::Utf8($arr) => ArrayData::Utf8($body),
            ArrayData::Timestamp($arr) => ArrayData::Timestamp($body),
        }
    };
}

/// Applies `$body` to the inner array of every variant.
macro_rules! with_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            ArrayData::Float64($arr) => $body,
            ArrayData::Float32($arr) => $body,
            ArrayData::Int64($arr) => $body,
            ArrayData::UInt64($arr) => $body,
            ArrayData::Utf8($arr) => $body,
            ArrayData::Timestamp($arr) => $body,
        }
    };
}

/// Typed N-dimensional array
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Float64(ArrayD<f64>),
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
    UInt64(ArrayD<u64>),
    Utf8(ArrayD<String>),
    /// Microseconds since the Unix epoch, UTC
    Timestamp(ArrayD<i64>),
}

impl ArrayData {
    /// Build a 1-D timestamp array
    pub fn timestamps(values: &[DateTime<Utc>]) -> Self {
        let micros: Vec<i64> = values.iter().map(DateTime::timestamp_micros).collect();
        ArrayData::Timestamp(Array1::from(micros).into_dyn())
    }

    /// Shape of the underlying array
    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    /// Whether the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short element type name, used in messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ArrayData::Float64(_) => "float64",
            ArrayData::Float32(_) => "float32",
            ArrayData::Int64(_) => "int64",
            ArrayData::UInt64(_) => "uint64",
            ArrayData::Utf8(_) => "string",
            ArrayData::Timestamp(_) => "timestamp",
        }
    }

    /// Copy out the contiguous range `range` along `axis`
    pub fn slice_axis(&self, axis: usize, range: Range<usize>) -> Self {
        let slice = Slice::from(range);
        map_array!(self, a => a.slice_axis(Axis(axis), slice).to_owned())
    }

    /// Values as `f64` in logical (row-major) order, for numeric arrays only
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            ArrayData::Float64(a) => Some(a.iter().copied().collect()),
            ArrayData::Float32(a) => Some(a.iter().map(|v| f64::from(*v)).collect()),
            ArrayData::Int64(a) => Some(a.iter().map(|v| *v as f64).collect()),
            ArrayData::UInt64(a) => Some(a.iter().map(|v| *v as f64).collect()),
            ArrayData::Utf8(_) | ArrayData::Timestamp(_) => None,
        }
    }
}

impl From<ArrayD<f64>> for ArrayData {
    fn from(a: ArrayD<f64>) -> Self {
        ArrayData::Float64(a)
    }
}

impl From<ArrayD<f32>> for ArrayData {
    fn from(a: ArrayD<f32>) -> Self {
        ArrayData::Float32(a)
    }
}

impl From<ArrayD<i64>> for ArrayData {
    fn from(a: ArrayD<i64>) -> Self {
        ArrayData::Int64(a)
    }
}

impl From<ArrayD<u64>> for ArrayData {
    fn from(a: ArrayD<u64>) -> Self {
        ArrayData::UInt64(a)
    }
}

impl From<ArrayD<String>> for ArrayData {
    fn from(a: ArrayD<String>) -> Self {
        ArrayData::Utf8(a)
    }
}

impl From<Vec<f64>> for ArrayData {
    fn from(v: Vec<f64>) -> Self {
        ArrayData::Float64(Array1::from(v).into_dyn())
    }
}

impl From<Vec<f32>> for ArrayData {
    fn from(v: Vec<f32>) -> Self {
        ArrayData::Float32(Array1::from(v).into_dyn())
    }
}

impl From<Vec<i64>> for ArrayData {
    fn from(v: Vec<i64>) -> Self {
        ArrayData::Int64(Array1::from(v).into_dyn())
    }
}

/// A labelled array: dimension names plus data
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Vec<String>,
    data: ArrayData,
}

impl Variable {
    /// Create a variable, checking that `dims` matches the array rank
    pub fn new<S: Into<String>>(
        dims: impl IntoIterator<Item = S>,
        data: impl Into<ArrayData>,
    ) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        let data = data.into();

        if dims.len() != data.ndim() {
            return Err(Error::shape(
                dims.join(","),
                format!(
                    "{} dimension names given for a {}-d array",
                    dims.len(),
                    data.ndim()
                ),
            ));
        }

        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(Error::shape(dim, "dimension listed twice"));
            }
        }

        Ok(Self { dims, data })
    }

    /// Dimension names, outermost first
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    /// Underlying array
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Shape of the underlying array
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Position of `dim` among this variable's dimensions
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Restrict the variable to `range` along `dim`; unchanged if `dim` is not spanned
    pub fn slice(&self, dim: &str, range: Range<usize>) -> Self {
        match self.axis_of(dim) {
            Some(axis) => Self {
                dims: self.dims.clone(),
                data: self.data.slice_axis(axis, range),
            },
            None => self.clone(),
        }
    }
}
