//! Batched Parquet writer
//!
//! Streams a dataset into a single Parquet artifact one iteration-dimension
//! batch at a time. Every batch is flushed as its own row group(s), so at
//! most one batch plus the encoder's buffer is resident.

use super::batching::{batch_bounds, batch_ranges};
use super::destination::{Destination, OutputSink, SinkAbort, DEFAULT_UPLOAD_BUFFER_SIZE};
use super::table::{dataset_to_record_batch, pandas_metadata, table_schema};
use crate::dataset::GridDataset;
use crate::error::{Error, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use parquet::arrow::AsyncArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// Writer Config
// ============================================================================

/// Compression codec selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// GZIP at the default level
    #[default]
    Gzip,
    /// Snappy
    Snappy,
    /// ZSTD at the default level
    Zstd,
    /// No compression
    Uncompressed,
}

impl From<CompressionCodec> for Compression {
    fn from(codec: CompressionCodec) -> Self {
        match codec {
            CompressionCodec::Gzip => Compression::GZIP(GzipLevel::default()),
            CompressionCodec::Snappy => Compression::SNAPPY,
            CompressionCodec::Zstd => Compression::ZSTD(ZstdLevel::default()),
            CompressionCodec::Uncompressed => Compression::UNCOMPRESSED,
        }
    }
}

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
    dictionary_enabled: bool,
    statistics_enabled: bool,
}

impl ParquetWriterConfig {
    /// Get dictionary encoding enabled
    #[must_use]
    pub fn is_dictionary_enabled(&self) -> bool {
        self.dictionary_enabled
    }

    /// Get statistics enabled
    #[must_use]
    pub fn is_statistics_enabled(&self) -> bool {
        self.statistics_enabled
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    /// Get compression
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::GZIP(GzipLevel::default()),
            row_group_size: 10_000_000,
            dictionary_enabled: true,
            statistics_enabled: true,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set compression from a configuration codec
    #[must_use]
    pub fn with_codec(self, codec: CompressionCodec) -> Self {
        self.with_compression(codec.into())
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    /// Enable or disable statistics
    #[must_use]
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    /// Check values that would otherwise surface mid-write
    pub fn validate(&self) -> Result<()> {
        if self.row_group_size == 0 {
            return Err(Error::invalid_value(
                "row_group_size",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Build writer properties, recording `index_column` as the row index
    fn build_properties(&self, schema: &SchemaRef, index_column: &str) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_created_by(format!("{} version {}", crate::NAME, crate::VERSION))
            .set_key_value_metadata(Some(vec![KeyValue::new(
                "pandas".to_string(),
                pandas_metadata(schema, index_column),
            )]));

        if !self.dictionary_enabled {
            builder = builder.set_dictionary_enabled(false);
        }

        if !self.statistics_enabled {
            builder = builder.set_statistics_enabled(EnabledStatistics::None);
        }

        builder.build()
    }
}

// ============================================================================
// Batch Writer
// ============================================================================

/// Appends record batches to one Parquet artifact, one row group boundary per batch
pub struct ParquetBatchWriter {
    writer: AsyncArrowWriter<OutputSink>,
    sink: SinkAbort,
    destination: String,
    batches_written: usize,
    rows_written: usize,
}

impl ParquetBatchWriter {
    /// Start a Parquet file on `sink`
    ///
    /// The header goes out with the first row group; nothing is readable
    /// until [`close`](Self::close) writes the footer.
    pub fn new(
        sink: OutputSink,
        schema: SchemaRef,
        index_column: &str,
        config: &ParquetWriterConfig,
        destination: impl Into<String>,
    ) -> Result<Self> {
        let destination = destination.into();
        let sink_abort = sink.abort_handle();
        let props = config.build_properties(&schema, index_column);
        let writer = AsyncArrowWriter::try_new(sink, schema, Some(props))
            .map_err(|e| Error::write(&destination, 0, format!("Failed to create Parquet writer: {e}")))?;

        Ok(Self {
            writer,
            sink: sink_abort,
            destination,
            batches_written: 0,
            rows_written: 0,
        })
    }

    /// Append `batch` and close its row group
    pub async fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        let index = self.batches_written;
        self.writer
            .write(batch)
            .await
            .map_err(|e| Error::write(&self.destination, index, e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| Error::write(&self.destination, index, e.to_string()))?;

        self.batches_written += 1;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Number of batches appended so far
    #[must_use]
    pub fn batches_written(&self) -> usize {
        self.batches_written
    }

    /// Get the number of rows written so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Write the footer and release the sink
    pub async fn close(self) -> Result<WriteSummary> {
        let metadata = self.writer.close().await.map_err(|e| {
            Error::write(
                &self.destination,
                self.batches_written,
                format!("Failed to close Parquet writer: {e}"),
            )
        })?;

        Ok(WriteSummary {
            destination: self.destination,
            batches: self.batches_written,
            rows: self.rows_written,
            row_groups: metadata.row_groups.len(),
        })
    }

    /// Give up on the file: remove the partial local file or abort the upload
    pub async fn abort(self) {
        let Self {
            writer,
            sink,
            destination,
            batches_written,
            ..
        } = self;
        drop(writer);

        match sink.abort().await {
            Ok(()) => debug!("Discarded partial output at {}", destination),
            Err(e) => warn!(
                "Failed to discard partial output at {} after {} batches: {}",
                destination, batches_written, e
            ),
        }
    }
}

// ============================================================================
// Batched Write
// ============================================================================

/// What to batch over and how to encode
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Dimension sliced into batches
    pub iter_dim: String,
    /// Iteration-dimension entries per batch
    pub batch_size: usize,
    /// Parquet encoding settings
    pub parquet: ParquetWriterConfig,
    /// Bytes buffered before an object-store write switches to multipart
    pub upload_buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            iter_dim: "time".to_string(),
            batch_size: 6,
            parquet: ParquetWriterConfig::default(),
            upload_buffer_size: DEFAULT_UPLOAD_BUFFER_SIZE,
        }
    }
}

impl WriteOptions {
    /// Options batching `iter_dim` by `batch_size`
    pub fn new(iter_dim: impl Into<String>, batch_size: usize) -> Self {
        Self {
            iter_dim: iter_dim.into(),
            batch_size,
            ..Self::default()
        }
    }

    /// Set the Parquet encoding settings
    #[must_use]
    pub fn with_parquet(mut self, parquet: ParquetWriterConfig) -> Self {
        self.parquet = parquet;
        self
    }

    /// Set the object-store upload buffer size
    #[must_use]
    pub fn with_upload_buffer_size(mut self, size: usize) -> Self {
        self.upload_buffer_size = size;
        self
    }

    /// Reject settings that cannot produce a file
    pub fn validate(&self) -> Result<()> {
        if self.iter_dim.is_empty() {
            return Err(Error::invalid_value("iter_dim", "cannot be empty"));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_value("batch_size", "must be greater than 0"));
        }
        if self.upload_buffer_size == 0 {
            return Err(Error::invalid_value(
                "upload_buffer_size",
                "must be greater than 0",
            ));
        }
        self.parquet.validate()
    }
}

/// Progress of one appended batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based batch counter
    pub batch: usize,
    /// Total number of batches
    pub total: usize,
    /// First iteration index of the batch
    pub start: usize,
    /// One past the last iteration index of the batch
    pub end: usize,
    /// Rows in this batch
    pub rows: usize,
    /// Rows written including this batch
    pub rows_written: usize,
}

/// Outcome of a completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Where the file went
    pub destination: String,
    /// Number of batches appended
    pub batches: usize,
    /// Total rows written
    pub rows: usize,
    /// Row groups in the finished file
    pub row_groups: usize,
}

/// Write `dataset` to `destination`, batching along `options.iter_dim`
pub async fn write_batched(
    dataset: &GridDataset,
    destination: &Destination,
    options: &WriteOptions,
) -> Result<WriteSummary> {
    write_batched_with_progress(dataset, destination, options, |_| {}).await
}

/// Like [`write_batched`], calling `on_batch` after every appended batch
pub async fn write_batched_with_progress<F>(
    dataset: &GridDataset,
    destination: &Destination,
    options: &WriteOptions,
    on_batch: F,
) -> Result<WriteSummary>
where
    F: FnMut(&BatchProgress),
{
    let plan = plan(dataset, options)?;
    let sink = destination.open(options.upload_buffer_size).await?;
    write_plan(dataset, plan, sink, destination.to_string(), options, on_batch).await
}

/// Write through an already configured object store, e.g. an in-memory one
pub async fn write_batched_to_store<F>(
    dataset: &GridDataset,
    store: Arc<dyn ObjectStore>,
    path: &ObjectPath,
    options: &WriteOptions,
    on_batch: F,
) -> Result<WriteSummary>
where
    F: FnMut(&BatchProgress),
{
    let plan = plan(dataset, options)?;
    let sink = OutputSink::object_store_with_capacity(store, path.clone(), options.upload_buffer_size);
    write_plan(dataset, plan, sink, path.to_string(), options, on_batch).await
}

struct Plan {
    bounds: Vec<usize>,
    schema: SchemaRef,
}

/// Everything that can fail before the destination is touched
fn plan(dataset: &GridDataset, options: &WriteOptions) -> Result<Plan> {
    options.validate()?;
    let size = dataset.dim_len(&options.iter_dim)?;
    let bounds = batch_bounds(size, options.batch_size)?;
    let schema = table_schema(dataset, &options.iter_dim)?;
    Ok(Plan { bounds, schema })
}

async fn write_plan<F>(
    dataset: &GridDataset,
    plan: Plan,
    sink: OutputSink,
    destination: String,
    options: &WriteOptions,
    on_batch: F,
) -> Result<WriteSummary>
where
    F: FnMut(&BatchProgress),
{
    let total = plan.bounds.len() - 1;
    info!(
        "Writing {} batches of {} along '{}' to {}",
        total, options.batch_size, options.iter_dim, destination
    );

    let mut writer = ParquetBatchWriter::new(
        sink,
        plan.schema,
        &options.iter_dim,
        &options.parquet,
        destination,
    )?;

    match append_batches(dataset, &plan.bounds, &mut writer, options, on_batch).await {
        Ok(()) => writer.close().await,
        Err(e) => {
            writer.abort().await;
            Err(e)
        }
    }
}

async fn append_batches<F>(
    dataset: &GridDataset,
    bounds: &[usize],
    writer: &mut ParquetBatchWriter,
    options: &WriteOptions,
    mut on_batch: F,
) -> Result<()>
where
    F: FnMut(&BatchProgress),
{
    let total = bounds.len() - 1;

    for (i, range) in batch_ranges(bounds).enumerate() {
        let (start, end) = (range.start, range.end);

        let batch = {
            let slice = dataset.slice(&options.iter_dim, range)?;
            dataset_to_record_batch(&slice, &options.iter_dim)?
        };
        writer.append(&batch).await?;

        let progress = BatchProgress {
            batch: i + 1,
            total,
            start,
            end,
            rows: batch.num_rows(),
            rows_written: writer.rows_written(),
        };
        info!(
            "step {:04}/{:04} indices:{:04}=>{:04}",
            progress.batch, total, start, end
        );
        debug!("{} rows written", progress.rows_written);
        on_batch(&progress);
    }

    Ok(())
}
