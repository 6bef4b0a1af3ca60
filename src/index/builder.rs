//! Index builder
//!
//! Derives one cell-id field per resolution level from the longitude and
//! latitude axes of a dataset.

use super::indexer::GeoIndexer;
use super::types::{index_field_name, IndexBuild, IndexFormat, IndexOptions, LevelOutcome};
use crate::dataset::{ArrayData, GridDataset, Variable};
use crate::error::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use tracing::{debug, info};

/// Wrap a shifted longitude into `[-180, 180)`
pub fn normalize_longitude(lon: f64, half_step: f64) -> f64 {
    let wrapped = (lon + half_step + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid may round up to 360 for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Half the spacing between the first two axis values, 0 for shorter axes
pub fn half_step(axis: &[f64]) -> f64 {
    match axis {
        [first, second, ..] => (second - first) / 2.0,
        _ => 0.0,
    }
}

/// Shift axis values to cell centers, wrapping longitudes when `wrap` is set
pub fn cell_centers(axis: &[f64], wrap: bool) -> Vec<f64> {
    let half = half_step(axis);
    axis.iter()
        .map(|v| {
            if wrap {
                normalize_longitude(*v, half)
            } else {
                v + half
            }
        })
        .collect()
}

/// Build the requested index fields
///
/// Takes ownership of `dataset` and hands it back with the new fields, so
/// existing variables are moved rather than copied. Levels whose field name
/// already exists are reported with `computed: false`.
pub fn build_indexes(
    dataset: GridDataset,
    options: &IndexOptions,
    indexer: &dyn GeoIndexer,
) -> Result<IndexBuild> {
    let lon_dim = axis_dim(&dataset, &options.lon_name)?;
    let lat_dim = axis_dim(&dataset, &options.lat_name)?;

    let lons = cell_centers(&dataset.coord_values(&options.lon_name)?, true);
    let lats = cell_centers(&dataset.coord_values(&options.lat_name)?, false);

    let shape = [lons.len(), lats.len()];
    let (flat_lon, flat_lat) = outer_product(&lons, &lats);

    let mut out = dataset;
    let mut levels = Vec::with_capacity(options.levels.len());

    for &level in &options.levels {
        let name = index_field_name(level);

        if out.contains(&name) {
            debug!("Index field {} already present, skipping", name);
            levels.push(LevelOutcome {
                level,
                name,
                computed: false,
            });
            continue;
        }

        info!(
            "Building index {} ({} cells, format={})",
            name,
            flat_lon.len(),
            options.format
        );

        let ids = indexer.cell_ids(&flat_lon, &flat_lat, level)?;
        let data = match options.format {
            IndexFormat::Int => ArrayData::UInt64(reshape(&name, &shape, ids)?),
            IndexFormat::Str => {
                let tokens = ids.iter().map(|id| indexer.cell_token(*id)).collect();
                ArrayData::Utf8(reshape(&name, &shape, tokens)?)
            }
        };

        out.insert_var(name.clone(), Variable::new([&lon_dim, &lat_dim], data)?)?;
        levels.push(LevelOutcome {
            level,
            name,
            computed: true,
        });
    }

    Ok(IndexBuild {
        dataset: out,
        levels,
    })
}

/// Dimension spanned by the 1-D axis coordinate `name`
fn axis_dim(dataset: &GridDataset, name: &str) -> Result<String> {
    let coord = dataset.get(name).ok_or_else(|| Error::missing_var(name))?;
    match coord.dims() {
        [dim] => Ok(dim.clone()),
        dims => Err(Error::shape(
            name,
            format!("expected a 1-d axis, found dims {dims:?}"),
        )),
    }
}

/// Every (lon, lat) pair, longitude outermost
fn outer_product(lons: &[f64], lats: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = lons.len() * lats.len();
    let mut flat_lon = Vec::with_capacity(n);
    let mut flat_lat = Vec::with_capacity(n);

    for lon in lons {
        for lat in lats {
            flat_lon.push(*lon);
            flat_lat.push(*lat);
        }
    }
    (flat_lon, flat_lat)
}

fn reshape<T>(name: &str, shape: &[usize], values: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| Error::shape(name, e.to_string()))
}
