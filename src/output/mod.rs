//! Output module
//!
//! Streams a gridded dataset into a single Parquet file.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Planning batches along the iteration dimension
//! - Flattening a dataset slice into an Arrow RecordBatch
//! - Appending batches to one Parquet file, row group by row group
//! - Local and S3 destinations

mod batching;
mod destination;
mod table;
mod writer;

pub use batching::{batch_bounds, batch_ranges};
pub use destination::{
    Destination, OutputSink, S3Location, SinkAbort, DEFAULT_UPLOAD_BUFFER_SIZE, FILE_SCHEME,
    S3_SCHEME,
};
pub use table::{arrow_type, dataset_to_record_batch, pandas_metadata, table_schema};
pub use writer::{
    write_batched, write_batched_to_store, write_batched_with_progress, BatchProgress,
    CompressionCodec, ParquetBatchWriter, ParquetWriterConfig, WriteOptions, WriteSummary,
};
