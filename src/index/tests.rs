//! Tests for geospatial index module

use super::*;
use crate::dataset::{ArrayData, GridDataset};
use crate::error::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use test_case::test_case;

/// Encodes the point it was given so tests can check which center was asked for
#[derive(Default)]
struct RecordingIndexer {
    calls: AtomicUsize,
    lons: Mutex<Vec<f64>>,
}

impl GeoIndexer for RecordingIndexer {
    fn cell_id(&self, lon: f64, lat: f64, level: u8) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lons.lock().unwrap().push(lon);
        let lon_part = ((lon + 180.0) * 10.0).round() as u64;
        let lat_part = ((lat + 90.0) * 10.0).round() as u64;
        Ok(u64::from(level) * 100_000_000 + lon_part * 10_000 + lat_part)
    }
}

fn era5_like(lons: Vec<f64>, lats: Vec<f64>) -> GridDataset {
    let (nlon, nlat) = (lons.len(), lats.len());
    let precip = ArrayD::from_shape_vec(IxDyn(&[2, nlat, nlon]), vec![0.5f32; 2 * nlat * nlon]).unwrap();
    GridDataset::new()
        .with_coord("time", vec![0i64, 3600])
        .unwrap()
        .with_coord("lat", lats)
        .unwrap()
        .with_coord("lon", lons)
        .unwrap()
        .with_var("precipitation", ["time", "lat", "lon"], precip)
        .unwrap()
}

// ============================================================================
// Naming and Format Tests
// ============================================================================

#[test_case(0, "h3_00")]
#[test_case(3, "h3_03")]
#[test_case(15, "h3_15")]
fn test_index_field_name(level: u8, expected: &str) {
    assert_eq!(index_field_name(level), expected);
}

#[test]
fn test_index_format_parse() {
    assert_eq!("int".parse::<IndexFormat>().unwrap(), IndexFormat::Int);
    assert_eq!("str".parse::<IndexFormat>().unwrap(), IndexFormat::Str);
    assert_eq!(IndexFormat::default(), IndexFormat::Int);
}

#[test_case("float")]
#[test_case("INT")]
#[test_case("")]
fn test_index_format_unknown(value: &str) {
    let err = value.parse::<IndexFormat>().unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains(r#"["int", "str"]"#));
}

#[test]
fn test_index_options_yaml_rejects_unknown_format() {
    let err = serde_yaml::from_str::<IndexOptions>("format: hex").unwrap_err();
    assert!(err.to_string().contains("Unknown index format 'hex'"));
}

#[test]
fn test_index_options_defaults() {
    let options: IndexOptions = serde_yaml::from_str("{}").unwrap();
    assert_eq!(options, IndexOptions::default());
    assert_eq!(options.levels, vec![0]);
    assert_eq!(options.lon_name, "lon");
    assert_eq!(options.lat_name, "lat");
}

// ============================================================================
// Coordinate Correction Tests
// ============================================================================

#[test_case(179.9, 0.2, -179.9 ; "wraps past antimeridian")]
#[test_case(0.0, 0.125, 0.125 ; "inside range")]
#[test_case(180.0, 0.0, -180.0 ; "upper bound maps to lower")]
#[test_case(-180.0, 0.0, -180.0 ; "lower bound kept")]
#[test_case(359.75, 0.125, -0.125 ; "zero to 360 grid")]
#[test_case(-190.0, 0.0, 170.0 ; "below range")]
fn test_normalize_longitude(lon: f64, half: f64, expected: f64) {
    let got = normalize_longitude(lon, half);
    assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
}

#[test]
fn test_normalize_longitude_stays_in_range() {
    let mut lon = -720.0;
    while lon <= 720.0 {
        for half in [-0.5, -1e-17, 0.0, 1e-17, 0.125, 0.5] {
            let v = normalize_longitude(lon, half);
            assert!((-180.0..180.0).contains(&v), "{lon} + {half} -> {v}");
        }
        lon += 0.05;
    }
    assert!((-180.0..180.0).contains(&normalize_longitude(-1e-20, 0.0)));
}

#[test]
fn test_half_step() {
    assert_eq!(half_step(&[0.0, 0.25, 0.5]), 0.125);
    assert_eq!(half_step(&[90.0, 89.75]), -0.125);
    assert_eq!(half_step(&[10.0]), 0.0);
    assert_eq!(half_step(&[]), 0.0);
}

#[test]
fn test_cell_centers() {
    assert_eq!(cell_centers(&[0.0, 1.0, 2.0], false), vec![0.5, 1.5, 2.5]);
    assert_eq!(cell_centers(&[179.0, 180.0], true), vec![179.5, -179.5]);
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_build_shape_and_order() {
    let ds = era5_like(vec![0.0, 1.0, 2.0], vec![10.0, 12.0]);
    let indexer = RecordingIndexer::default();

    let build = build_indexes(ds, &IndexOptions::new([2]), &indexer).unwrap();
    let field = build.dataset.var("h3_02").unwrap();

    assert_eq!(field.dims(), &["lon".to_string(), "lat".to_string()]);
    assert_eq!(field.shape(), &[3, 2]);
    assert_eq!(indexer.calls.load(Ordering::SeqCst), 6);

    let ArrayData::UInt64(ids) = field.data() else {
        panic!("Expected UInt64 array");
    };
    // lon 1.0 -> center 1.5, lat 12.0 -> center 13.0
    let expected = indexer.cell_id(1.5, 13.0, 2).unwrap();
    assert_eq!(ids[[1, 1]], expected);
}

#[test]
fn test_build_feeds_normalized_longitudes() {
    let lons: Vec<f64> = (0..8).map(|i| f64::from(i) * 45.0).collect();
    let ds = era5_like(lons, vec![-10.0, 0.0]);
    let indexer = RecordingIndexer::default();

    build_indexes(ds, &IndexOptions::new([0]), &indexer).unwrap();

    let seen = indexer.lons.lock().unwrap();
    assert_eq!(seen.len(), 16);
    assert!(seen.iter().all(|v| (-180.0..180.0).contains(v)));
    assert!(seen.contains(&-157.5));
}

#[test]
fn test_build_carries_existing_variables() {
    let ds = era5_like(vec![0.0, 1.0], vec![0.0, 1.0]);
    let before = ds.clone();

    let build = build_indexes(ds, &IndexOptions::new([0, 1]), &H3Indexer::new()).unwrap();

    for (name, var) in before.coords().chain(before.data_vars()) {
        assert_eq!(build.dataset.get(name), Some(var));
    }
    assert_eq!(build.dataset.dims(), before.dims());
    assert!(build.dataset.contains("h3_00"));
    assert!(build.dataset.contains("h3_01"));
    assert_eq!(build.computed().collect::<Vec<_>>(), vec!["h3_00", "h3_01"]);
}

#[test]
fn test_build_moves_variables_without_copying() {
    let ds = era5_like(vec![0.0, 1.0, 2.0], vec![0.0, 1.0]);
    let ArrayData::Float32(before) = ds.var("precipitation").unwrap().data() else {
        panic!("Expected Float32 array");
    };
    let buffer = before.as_ptr();

    let build = build_indexes(ds, &IndexOptions::new([0]), &H3Indexer::new()).unwrap();

    let ArrayData::Float32(after) = build.dataset.var("precipitation").unwrap().data() else {
        panic!("Expected Float32 array");
    };
    assert_eq!(after.as_ptr(), buffer);
}

#[test]
fn test_build_is_idempotent() {
    let ds = era5_like(vec![0.0, 0.25, 0.5], vec![45.0, 45.25]);
    let first = build_indexes(ds, &IndexOptions::new([0, 3]), &H3Indexer::new()).unwrap();

    let indexer = RecordingIndexer::default();
    let second = build_indexes(first.dataset.clone(), &IndexOptions::new([0, 3]), &indexer).unwrap();

    assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    assert!(second.levels.iter().all(|l| !l.computed));
    assert_eq!(second.dataset, first.dataset);
}

#[test]
fn test_build_duplicate_levels() {
    let ds = era5_like(vec![0.0, 1.0], vec![0.0, 1.0]);
    let build = build_indexes(ds, &IndexOptions::new([4, 4]), &H3Indexer::new()).unwrap();

    let flags: Vec<bool> = build.levels.iter().map(|l| l.computed).collect();
    assert_eq!(flags, vec![true, false]);
    assert_eq!(build.levels[1].name, "h3_04");
}

#[test]
fn test_build_is_deterministic() {
    let ds = era5_like(vec![-10.0, -9.75, -9.5], vec![50.0, 50.25]);
    let options = IndexOptions::new([0, 5, 9]);

    let a = build_indexes(ds.clone(), &options, &H3Indexer::new()).unwrap();
    let b = build_indexes(ds, &options, &H3Indexer::new()).unwrap();
    assert_eq!(a.dataset, b.dataset);
}

#[test]
fn test_build_string_format_matches_int() {
    let ds = era5_like(vec![2.0, 2.25], vec![48.75, 49.0]);

    let ints = build_indexes(ds.clone(), &IndexOptions::new([7]), &H3Indexer::new()).unwrap();
    let strs = build_indexes(
        ds,
        &IndexOptions::new([7]).with_format(IndexFormat::Str),
        &H3Indexer::new(),
    )
    .unwrap();

    let ArrayData::UInt64(ids) = ints.dataset.var("h3_07").unwrap().data() else {
        panic!("Expected UInt64 array");
    };
    let ArrayData::Utf8(tokens) = strs.dataset.var("h3_07").unwrap().data() else {
        panic!("Expected Utf8 array");
    };

    for (id, token) in ids.iter().zip(tokens.iter()) {
        assert_eq!(token.len(), 15);
        assert_eq!(u64::from_str_radix(token, 16).unwrap(), *id);
    }
}

#[test]
fn test_build_custom_axis_names() {
    let ds = GridDataset::new()
        .with_coord("latitude", vec![0.0, 1.0])
        .unwrap()
        .with_coord("longitude", vec![0.0, 1.0, 2.0])
        .unwrap();
    let options = IndexOptions::new([1]).with_axes("longitude", "latitude");

    let build = build_indexes(ds, &options, &H3Indexer::new()).unwrap();
    let field = build.dataset.var("h3_01").unwrap();
    assert_eq!(field.dims(), &["longitude".to_string(), "latitude".to_string()]);
}

#[test]
fn test_build_missing_axis() {
    let ds = GridDataset::new().with_coord("lat", vec![0.0, 1.0]).unwrap();
    let err = build_indexes(ds, &IndexOptions::default(), &H3Indexer::new()).unwrap_err();
    assert!(matches!(err, Error::MissingVariable { ref name } if name == "lon"));
}

// ============================================================================
// H3 Indexer Tests
// ============================================================================

#[test]
fn test_h3_known_cell() {
    let id = H3Indexer::new()
        .cell_id(-122.055_323_8, 37.361_559_3, 5)
        .unwrap();
    assert_eq!(H3Indexer::new().cell_token(id), "85283473fffffff");
}

#[test]
fn test_h3_invalid_level() {
    let err = H3Indexer::new().cell_id(0.0, 0.0, 16).unwrap_err();
    assert!(matches!(err, Error::GeoIndex { .. }));
}

#[test]
fn test_h3_non_finite_point() {
    assert!(H3Indexer::new().cell_id(f64::NAN, 0.0, 0).is_err());
}

#[test]
fn test_bulk_length_mismatch() {
    let err = H3Indexer::new().cell_ids(&[0.0, 1.0], &[0.0], 0).unwrap_err();
    assert!(err.is_shape());

    let err = RecordingIndexer::default()
        .cell_ids(&[0.0], &[], 0)
        .unwrap_err();
    assert!(err.is_shape());
}

#[test]
fn test_bulk_matches_single() {
    let indexer = H3Indexer::new();
    let lons = [-73.98, 139.69, 2.35];
    let lats = [40.75, 35.69, 48.86];
    let bulk = indexer.cell_ids(&lons, &lats, 8).unwrap();
    for (i, id) in bulk.iter().enumerate() {
        assert_eq!(*id, indexer.cell_id(lons[i], lats[i], 8).unwrap());
    }
}
