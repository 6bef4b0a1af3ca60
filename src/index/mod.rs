//! Geospatial index module
//!
//! Attaches discrete cell identifiers to every grid point of a dataset.
//!
//! # Overview
//!
//! - `build_indexes` - one `h3_NN` field per requested level, shaped like the
//!   `(lon, lat)` grid, computed from cell centers
//! - `GeoIndexer` - the cell lookup seam, implemented by `H3Indexer`
//! - `IndexFormat` - compact `u64` ids or hexadecimal tokens

mod builder;
mod indexer;
mod types;

pub use builder::{build_indexes, cell_centers, half_step, normalize_longitude};
pub use indexer::{GeoIndexer, H3Indexer};
pub use types::{
    index_field_name, IndexBuild, IndexFormat, IndexOptions, LevelOutcome, INDEX_FIELD_PREFIX,
    MAX_LEVEL,
};

#[cfg(test)]
mod tests;
