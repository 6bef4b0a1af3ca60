//! Dataset to Arrow conversion
//!
//! Flattens a `GridDataset` into one row per combination of dimension
//! indices. The iteration dimension is outermost and its coordinate is the
//! first column; the coordinates of the other dimensions follow, then every
//! remaining coordinate and data variable, broadcast to the full row count.

use crate::dataset::{ArrayData, GridDataset, Variable};
use crate::error::{Error, Result};
use arrow::array::{
    ArrayRef, Float32Array, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use ndarray::{ArrayD, Axis, IxDyn};
use serde_json::{json, Value};
use std::sync::Arc;

/// One output column: its name and where its values come from
enum ColumnSource<'a> {
    Variable(&'a Variable),
    /// Dimension without coordinate: row position along the dimension
    Position,
}

struct Layout<'a> {
    dims: Vec<String>,
    shape: Vec<usize>,
    columns: Vec<(String, ColumnSource<'a>)>,
}

/// Dimension order of the flattened table: `iter_dim` first, then the rest
/// in dataset order
fn layout<'a>(dataset: &'a GridDataset, iter_dim: &str) -> Result<Layout<'a>> {
    let iter_len = dataset.dim_len(iter_dim)?;

    let mut dims = vec![iter_dim.to_string()];
    let mut shape = vec![iter_len];
    for (name, len) in dataset.dims() {
        if name != iter_dim {
            dims.push(name.clone());
            shape.push(*len);
        }
    }

    let mut columns = Vec::new();
    for dim in &dims {
        let source = match dataset.get(dim) {
            Some(var) if var.dims().len() == 1 && var.dims()[0] == *dim => {
                ColumnSource::Variable(var)
            }
            _ => ColumnSource::Position,
        };
        columns.push((dim.clone(), source));
    }

    for (name, var) in dataset.coords().chain(dataset.data_vars()) {
        if !dims.contains(name) {
            columns.push((name.clone(), ColumnSource::Variable(var)));
        }
    }

    Ok(Layout {
        dims,
        shape,
        columns,
    })
}

/// Arrow type for an array's element type
pub fn arrow_type(data: &ArrayData) -> DataType {
    match data {
        ArrayData::Float64(_) => DataType::Float64,
        ArrayData::Float32(_) => DataType::Float32,
        ArrayData::Int64(_) => DataType::Int64,
        ArrayData::UInt64(_) => DataType::UInt64,
        ArrayData::Utf8(_) => DataType::Utf8,
        ArrayData::Timestamp(_) => DataType::Timestamp(TimeUnit::Microsecond, None),
    }
}

/// Arrow schema of the flattened table, without touching the data
pub fn table_schema(dataset: &GridDataset, iter_dim: &str) -> Result<SchemaRef> {
    let layout = layout(dataset, iter_dim)?;
    Ok(Arc::new(schema_for(&layout)))
}

fn schema_for(layout: &Layout<'_>) -> Schema {
    let fields: Vec<Field> = layout
        .columns
        .iter()
        .map(|(name, source)| {
            let dtype = match source {
                ColumnSource::Variable(var) => arrow_type(var.data()),
                ColumnSource::Position => DataType::Int64,
            };
            Field::new(name, dtype, false)
        })
        .collect();
    Schema::new(fields)
}

/// Flatten `dataset` into a `RecordBatch` with `iter_dim` as the outermost axis
pub fn dataset_to_record_batch(dataset: &GridDataset, iter_dim: &str) -> Result<RecordBatch> {
    let layout = layout(dataset, iter_dim)?;
    let schema = Arc::new(schema_for(&layout));

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(layout.columns.len());
    for (name, source) in &layout.columns {
        let column = match source {
            ColumnSource::Variable(var) => variable_column(name, var, &layout)?,
            ColumnSource::Position => position_column(name, &layout)?,
        };
        columns.push(column);
    }

    RecordBatch::try_new(schema, columns).map_err(Into::into)
}

fn variable_column(name: &str, var: &Variable, layout: &Layout<'_>) -> Result<ArrayRef> {
    let dims = var.dims();
    let column: ArrayRef = match var.data() {
        ArrayData::Float64(a) => Arc::new(Float64Array::from(broadcast(name, a, dims, layout)?)),
        ArrayData::Float32(a) => Arc::new(Float32Array::from(broadcast(name, a, dims, layout)?)),
        ArrayData::Int64(a) => Arc::new(Int64Array::from(broadcast(name, a, dims, layout)?)),
        ArrayData::UInt64(a) => Arc::new(UInt64Array::from(broadcast(name, a, dims, layout)?)),
        ArrayData::Utf8(a) => Arc::new(StringArray::from(broadcast(name, a, dims, layout)?)),
        ArrayData::Timestamp(a) => Arc::new(TimestampMicrosecondArray::from(broadcast(
            name, a, dims, layout,
        )?)),
    };
    Ok(column)
}

fn position_column(name: &str, layout: &Layout<'_>) -> Result<ArrayRef> {
    let axis = layout
        .dims
        .iter()
        .position(|d| d == name)
        .ok_or_else(|| Error::missing_dim(name))?;
    let positions: ArrayD<i64> = ndarray::Array1::from_iter(0..layout.shape[axis] as i64).into_dyn();
    let values = broadcast(name, &positions, &[name.to_string()], layout)?;
    Ok(Arc::new(Int64Array::from(values)))
}

/// Values of `array` (spanning `dims`) repeated over the full table shape, in
/// row order
fn broadcast<T: Clone>(
    name: &str,
    array: &ArrayD<T>,
    dims: &[String],
    layout: &Layout<'_>,
) -> Result<Vec<T>> {
    let mut positions = Vec::with_capacity(dims.len());
    for dim in dims {
        let position = layout.dims.iter().position(|d| d == dim).ok_or_else(|| {
            Error::shape(name, format!("dimension '{dim}' is not a dataset dimension"))
        })?;
        positions.push(position);
    }

    // Reorder the variable's axes to follow the table's dimension order
    let mut order: Vec<usize> = (0..dims.len()).collect();
    order.sort_by_key(|&axis| positions[axis]);
    let present: Vec<usize> = order.iter().map(|&axis| positions[axis]).collect();

    let mut view = array.view().permuted_axes(order);
    for axis in 0..layout.dims.len() {
        if !present.contains(&axis) {
            view = view.insert_axis(Axis(axis));
        }
    }

    let expanded = view.broadcast(IxDyn(&layout.shape)).ok_or_else(|| {
        Error::shape(
            name,
            format!(
                "cannot broadcast {:?} to table shape {:?}",
                array.shape(),
                layout.shape
            ),
        )
    })?;
    Ok(expanded.iter().cloned().collect())
}

// ============================================================================
// Index metadata
// ============================================================================

/// `pandas` key-value metadata marking `index` as the row index
///
/// Readers that understand it (pandas via pyarrow or fastparquet) restore
/// the iteration coordinate as the frame index.
pub fn pandas_metadata(schema: &Schema, index: &str) -> String {
    let columns: Vec<Value> = schema
        .fields()
        .iter()
        .map(|field| {
            let (pandas_type, numpy_type) = pandas_types(field.data_type());
            json!({
                "name": field.name(),
                "field_name": field.name(),
                "pandas_type": pandas_type,
                "numpy_type": numpy_type,
                "metadata": Value::Null,
            })
        })
        .collect();

    json!({
        "index_columns": [index],
        "column_indexes": [{
            "name": Value::Null,
            "field_name": Value::Null,
            "pandas_type": "unicode",
            "numpy_type": "object",
            "metadata": {"encoding": "UTF-8"},
        }],
        "columns": columns,
        "creator": {"library": crate::NAME, "version": crate::VERSION},
        "pandas_version": "1.5.3",
    })
    .to_string()
}

fn pandas_types(dtype: &DataType) -> (&'static str, &'static str) {
    match dtype {
        DataType::Float64 => ("float64", "float64"),
        DataType::Float32 => ("float32", "float32"),
        DataType::Int64 => ("int64", "int64"),
        DataType::UInt64 => ("uint64", "uint64"),
        DataType::Utf8 => ("unicode", "object"),
        DataType::Timestamp(_, _) => ("datetime", "datetime64[ns]"),
        _ => ("object", "object"),
    }
}
