//! Conversion configuration
//!
//! A conversion is described in YAML: where the file goes, which index
//! levels to build and how to batch and encode the output.
//!
//! ```yaml
//! destination: s3://bucket/era5/2022-05.parquet
//! index:
//!   levels: [0, 1, 2, 3]
//!   format: int
//! output:
//!   iter_dim: time
//!   batch_size: 6
//! ```

use crate::error::{Error, Result};
use crate::index::{IndexOptions, MAX_LEVEL};
use crate::output::{
    CompressionCodec, ParquetWriterConfig, WriteOptions, DEFAULT_UPLOAD_BUFFER_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete conversion configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// `s3://bucket/key` or a local path
    pub destination: String,

    /// Index fields to derive
    #[serde(default)]
    pub index: IndexOptions,

    /// Batching and encoding of the output file
    #[serde(default)]
    pub output: OutputConfig,
}

impl ConversionConfig {
    /// Config writing to `destination` with every other setting at its default
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            index: IndexOptions::default(),
            output: OutputConfig::default(),
        }
    }

    /// Set the index options
    #[must_use]
    pub fn with_index(mut self, index: IndexOptions) -> Self {
        self.index = index;
        self
    }

    /// Set the output options
    #[must_use]
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Check everything that does not need the dataset
    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(Error::config("Destination cannot be empty"));
        }

        if let Some(level) = self.index.levels.iter().find(|l| **l > MAX_LEVEL) {
            return Err(Error::invalid_value(
                "index.levels",
                format!("level {level} is outside 0..={MAX_LEVEL}"),
            ));
        }

        if self.index.lon_name.is_empty() || self.index.lat_name.is_empty() {
            return Err(Error::config("Index axis names cannot be empty"));
        }

        self.output.validate()
    }

    /// Writer options derived from the output section
    pub fn write_options(&self) -> WriteOptions {
        self.output.write_options()
    }
}

// ============================================================================
// Output Config
// ============================================================================

/// Output section of the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Dimension sliced into batches
    #[serde(default = "default_iter_dim")]
    pub iter_dim: String,

    /// Iteration-dimension entries per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum rows per Parquet row group
    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,

    /// Column compression
    #[serde(default)]
    pub compression: CompressionCodec,

    /// Dictionary encoding
    #[serde(default = "default_true")]
    pub dictionary: bool,

    /// Column statistics
    #[serde(default = "default_true")]
    pub statistics: bool,

    /// Bytes buffered before an S3 write switches to multipart
    #[serde(default = "default_upload_buffer_size")]
    pub upload_buffer_size: usize,
}

fn default_iter_dim() -> String {
    "time".to_string()
}

fn default_batch_size() -> usize {
    6
}

fn default_row_group_size() -> usize {
    10_000_000
}

fn default_upload_buffer_size() -> usize {
    DEFAULT_UPLOAD_BUFFER_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            iter_dim: default_iter_dim(),
            batch_size: default_batch_size(),
            row_group_size: default_row_group_size(),
            compression: CompressionCodec::default(),
            dictionary: true,
            statistics: true,
            upload_buffer_size: default_upload_buffer_size(),
        }
    }
}

impl OutputConfig {
    /// Reject non-positive sizes and an empty iteration dimension
    pub fn validate(&self) -> Result<()> {
        self.write_options().validate()
    }

    /// Translate into writer options
    pub fn write_options(&self) -> WriteOptions {
        let parquet = ParquetWriterConfig::new()
            .with_codec(self.compression)
            .with_row_group_size(self.row_group_size)
            .with_dictionary(self.dictionary)
            .with_statistics(self.statistics);

        WriteOptions::new(self.iter_dim.clone(), self.batch_size)
            .with_parquet(parquet)
            .with_upload_buffer_size(self.upload_buffer_size)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a conversion config from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ConversionConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_config_from_str(&content)
}

/// Load and validate a conversion config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<ConversionConfig> {
    let config: ConversionConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}
