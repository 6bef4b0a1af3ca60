//! Index builder types
//!
//! Options, format selection and per-level outcomes of an index build.

use crate::dataset::GridDataset;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every derived index field
pub const INDEX_FIELD_PREFIX: &str = "h3_";

/// Finest resolution level accepted by the hexagonal grid
pub const MAX_LEVEL: u8 = 15;

/// Name of the index field for `level`, e.g. `h3_03`
pub fn index_field_name(level: u8) -> String {
    format!("{INDEX_FIELD_PREFIX}{level:02}")
}

// ============================================================================
// Index Format
// ============================================================================

/// Storage format of the derived cell identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndexFormat {
    /// 64-bit unsigned integer
    #[default]
    Int,
    /// Lowercase hexadecimal token
    Str,
}

impl IndexFormat {
    /// Accepted textual names
    pub const ALLOWED: &'static [&'static str] = &["int", "str"];

    /// Textual name of this format
    pub fn as_str(self) -> &'static str {
        match self {
            IndexFormat::Int => "int",
            IndexFormat::Str => "str",
        }
    }
}

impl FromStr for IndexFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(IndexFormat::Int),
            "str" => Ok(IndexFormat::Str),
            other => Err(Error::UnknownIndexFormat {
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl TryFrom<String> for IndexFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IndexFormat> for String {
    fn from(format: IndexFormat) -> Self {
        format.as_str().to_string()
    }
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Options
// ============================================================================

/// What to build and where the spatial axes live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Resolution levels, each producing one field
    #[serde(default = "default_levels")]
    pub levels: Vec<u8>,

    /// Identifier storage format
    #[serde(default)]
    pub format: IndexFormat,

    /// Longitude coordinate name
    #[serde(default = "default_lon_name")]
    pub lon_name: String,

    /// Latitude coordinate name
    #[serde(default = "default_lat_name")]
    pub lat_name: String,
}

fn default_levels() -> Vec<u8> {
    vec![0]
}

fn default_lon_name() -> String {
    "lon".to_string()
}

fn default_lat_name() -> String {
    "lat".to_string()
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            format: IndexFormat::default(),
            lon_name: default_lon_name(),
            lat_name: default_lat_name(),
        }
    }
}

impl IndexOptions {
    /// Options for `levels` with default format and axis names
    pub fn new(levels: impl IntoIterator<Item = u8>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Set the identifier format
    #[must_use]
    pub fn with_format(mut self, format: IndexFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the longitude and latitude coordinate names
    #[must_use]
    pub fn with_axes(mut self, lon_name: impl Into<String>, lat_name: impl Into<String>) -> Self {
        self.lon_name = lon_name.into();
        self.lat_name = lat_name.into();
        self
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// What happened to one requested level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelOutcome {
    /// Requested level
    pub level: u8,
    /// Field name
    pub name: String,
    /// `false` when a field of that name already existed and was left untouched
    pub computed: bool,
}

/// Result of an index build: the augmented dataset plus per-level outcomes
#[derive(Debug, Clone)]
pub struct IndexBuild {
    /// Input dataset with the new index fields
    pub dataset: GridDataset,
    /// One entry per requested level, in request order
    pub levels: Vec<LevelOutcome>,
}

impl IndexBuild {
    /// Names of the fields computed by this build
    pub fn computed(&self) -> impl Iterator<Item = &str> {
        self.levels
            .iter()
            .filter(|l| l.computed)
            .map(|l| l.name.as_str())
    }

    /// Consume the build, keeping the dataset
    pub fn into_dataset(self) -> GridDataset {
        self.dataset
    }
}
