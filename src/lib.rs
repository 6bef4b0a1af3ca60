// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

//! # grid2parquet
//!
//! Converts coordinate-labelled gridded datasets (e.g. hourly reanalysis on a
//! regular lon/lat grid) into a single Parquet file, enriched with
//! hierarchical hexagonal cell ids for spatial lookups.
//!
//! ## Features
//!
//! - **Geospatial Index**: one H3 cell-id field per requested resolution level
//! - **Batched Writes**: bounded memory, one row group boundary per batch
//! - **Destinations**: local paths or `s3://bucket/key`
//! - **YAML Configuration**: levels, format, batching and compression
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use grid2parquet::{convert, load_config, GridDataset, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("convert.yaml")?;
//!
//!     let dataset = GridDataset::new()
//!         .with_coord("time", vec![0i64, 3600, 7200])?
//!         .with_coord("lat", vec![45.0, 45.25])?
//!         .with_coord("lon", vec![7.0, 7.25])?;
//!
//!     let report = convert(dataset, &config).await?;
//!     println!("{} rows -> {}", report.summary.rows, report.summary.destination);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   build_indexes    ┌──────────────┐   write_batched   ┌───────────┐
//! │ GridDataset  │ ─────────────────▶ │ + h3_NN vars │ ────────────────▶ │  Parquet  │
//! │ dims/coords  │    GeoIndexer      │ (lon, lat)   │  slice per batch  │ local / S3│
//! └──────────────┘                    └──────────────┘                   └───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Coordinate-labelled N-dimensional datasets
pub mod dataset;

/// Geospatial cell index builder
pub mod index;

/// Arrow/Parquet output
pub mod output;

/// YAML conversion configuration
pub mod config;

/// Index build followed by the batched write
pub mod pipeline;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use config::{load_config, load_config_from_str, ConversionConfig, OutputConfig};
pub use dataset::{ArrayData, GridDataset, Variable};
pub use index::{build_indexes, GeoIndexer, H3Indexer, IndexFormat, IndexOptions};
pub use output::{write_batched, Destination, WriteOptions, WriteSummary};
pub use pipeline::{convert, convert_with, ConversionReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
