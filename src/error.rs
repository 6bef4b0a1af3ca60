//! Error types for grid2parquet
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for grid2parquet
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown index format '{value}'. Allowed: {allowed:?}")]
    UnknownIndexFormat {
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Data Shape Errors
    // ============================================================================
    #[error("Dimension '{name}' not found in dataset")]
    MissingDimension { name: String },

    #[error("Variable or coordinate '{name}' not found in dataset")]
    MissingVariable { name: String },

    #[error("Shape mismatch for '{name}': {message}")]
    ShapeMismatch { name: String, message: String },

    // ============================================================================
    // Geospatial Index Errors
    // ============================================================================
    #[error("Geospatial index error: {message}")]
    GeoIndex { message: String },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Failed to write batch {batch} to {destination}: {message}")]
    Write {
        destination: String,
        batch: usize,
        message: String,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a missing dimension error
    pub fn missing_dim(name: impl Into<String>) -> Self {
        Self::MissingDimension { name: name.into() }
    }

    /// Create a missing variable error
    pub fn missing_var(name: impl Into<String>) -> Self {
        Self::MissingVariable { name: name.into() }
    }

    /// Create a shape mismatch error
    pub fn shape(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a geospatial index error
    pub fn geo_index(message: impl Into<String>) -> Self {
        Self::GeoIndex {
            message: message.into(),
        }
    }

    /// Create a batch write error carrying the destination and batch index
    pub fn write(destination: impl Into<String>, batch: usize, message: impl Into<String>) -> Self {
        Self::Write {
            destination: destination.into(),
            batch,
            message: message.into(),
        }
    }

    /// Configuration errors are detected before any computation starts
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::UnknownIndexFormat { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
        )
    }

    /// Data shape errors: a dimension, coordinate or variable is missing or inconsistent
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            Error::MissingDimension { .. }
                | Error::MissingVariable { .. }
                | Error::ShapeMismatch { .. }
        )
    }
}

/// Result type alias for grid2parquet
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
