//! Geospatial cell indexers
//!
//! `GeoIndexer` is the seam between the builder and the discrete grid
//! implementation. `H3Indexer` backs it with the `h3o` crate.

use crate::error::{Error, Result};
use h3o::{LatLng, Resolution};

/// Maps a point to the identifier of the cell containing it
pub trait GeoIndexer: Send + Sync {
    /// Cell id of (`lon`, `lat`) in degrees at `level`
    fn cell_id(&self, lon: f64, lat: f64, level: u8) -> Result<u64>;

    /// Bulk variant over paired coordinate slices
    fn cell_ids(&self, lons: &[f64], lats: &[f64], level: u8) -> Result<Vec<u64>> {
        if lons.len() != lats.len() {
            return Err(Error::shape(
                "coordinates",
                format!("{} longitudes for {} latitudes", lons.len(), lats.len()),
            ));
        }

        lons.iter()
            .zip(lats)
            .map(|(lon, lat)| self.cell_id(*lon, *lat, level))
            .collect()
    }

    /// Textual form of a cell id
    fn cell_token(&self, id: u64) -> String {
        format!("{id:x}")
    }
}

/// Hexagonal hierarchical index (H3)
#[derive(Debug, Clone, Copy, Default)]
pub struct H3Indexer;

impl H3Indexer {
    /// Create a new indexer
    pub fn new() -> Self {
        Self
    }

    fn resolution(level: u8) -> Result<Resolution> {
        Resolution::try_from(level)
            .map_err(|e| Error::geo_index(format!("invalid resolution level {level}: {e}")))
    }

    fn locate(lon: f64, lat: f64, resolution: Resolution) -> Result<u64> {
        let point = LatLng::new(lat, lon)
            .map_err(|e| Error::geo_index(format!("invalid point ({lon}, {lat}): {e}")))?;
        Ok(u64::from(point.to_cell(resolution)))
    }
}

impl GeoIndexer for H3Indexer {
    fn cell_id(&self, lon: f64, lat: f64, level: u8) -> Result<u64> {
        Self::locate(lon, lat, Self::resolution(level)?)
    }

    fn cell_ids(&self, lons: &[f64], lats: &[f64], level: u8) -> Result<Vec<u64>> {
        if lons.len() != lats.len() {
            return Err(Error::shape(
                "coordinates",
                format!("{} longitudes for {} latitudes", lons.len(), lats.len()),
            ));
        }

        // Resolve the level once for the whole grid
        let resolution = Self::resolution(level)?;
        lons.iter()
            .zip(lats)
            .map(|(lon, lat)| Self::locate(*lon, *lat, resolution))
            .collect()
    }
}
