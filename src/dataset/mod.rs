//! Dataset module
//!
//! In-memory gridded dataset: named dimensions, 1-D coordinates and
//! N-dimensional data variables.
//!
//! # Overview
//!
//! - `GridDataset` - the container, with shape checks on insert
//! - `Variable` - dimension names plus typed array
//! - `ArrayData` - the supported element types
//!
//! Loading from NetCDF/Zarr and renaming variables is left to the caller.

mod grid;
mod types;

pub use grid::GridDataset;
pub use types::{ArrayData, Variable};
