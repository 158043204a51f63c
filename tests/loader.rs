mod common;

use geo::Centroid;
use std::ptr;
use tract_explorer::data;

#[test]
fn init_loads_once_and_caches() {
    let dir = tempfile::tempdir().unwrap();
    let input = common::input_config(common::write_fixture(dir.path(), true));

    let first = data::init(&input).unwrap();
    assert_eq!(first.len(), common::TRACTS.len());

    // A later call never touches the file, even a missing one.
    let mut elsewhere = input.clone();
    elsewhere.shapefile = dir.path().join("missing.shp");
    let second = data::init(&elsewhere).unwrap();
    assert!(ptr::eq(first, second));
    assert!(ptr::eq(data::tracts().unwrap(), first));
}

#[test]
fn web_mercator_source_is_reprojected_to_lon_lat() {
    let dir = tempfile::tempdir().unwrap();
    let input = common::input_config(common::write_fixture(dir.path(), true));
    let tracts = data::load_tracts(&input).unwrap();

    for (tract, &(geoid, name, _, _, _, lon, lat)) in tracts.iter().zip(common::TRACTS) {
        assert_eq!(tract.geoid, geoid);
        assert_eq!(tract.name, name);
        let centroid = tract.geometry.centroid().unwrap();
        assert!((centroid.x() - (lon + common::SIDE / 2.0)).abs() < 1e-4, "{}", tract.geoid);
        assert!((centroid.y() - (lat + common::SIDE / 2.0)).abs() < 1e-4, "{}", tract.geoid);
    }
}

#[test]
fn area_is_derived_in_square_kilometers() {
    let dir = tempfile::tempdir().unwrap();
    let input = common::input_config(common::write_fixture(dir.path(), false));
    let tracts = data::load_tracts(&input).unwrap();

    // 0.01 degrees square near 40N: about 1.11 km by 0.85 km.
    let area = tracts[0].area_sqkm.unwrap();
    assert!(area > 0.9 && area < 1.0, "area {}", area);

    let mut no_area = input.clone();
    no_area.compute_area = false;
    assert!(data::load_tracts(&no_area).unwrap()[0].area_sqkm.is_none());
}

#[test]
fn configured_crs_overrides_prj() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = common::input_config(common::write_fixture(dir.path(), false));
    std::fs::remove_file(input.shapefile.with_extension("prj")).unwrap();
    assert!(data::load_tracts(&input).is_err());

    input.source_crs = Some("EPSG:4326".to_string());
    let tracts = data::load_tracts(&input).unwrap();
    let centroid = tracts[0].geometry.centroid().unwrap();
    assert!((centroid.x() - -75.075).abs() < 1e-9);
}

#[test]
fn missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = common::input_config(dir.path().join("nope.shp"));
    input.source_crs = Some("EPSG:4326".to_string());
    let err = data::load_tracts(&input).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to open Shapefile"));
}

#[test]
fn missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = common::input_config(common::write_fixture(dir.path(), false));
    input.columns.name = "NBHD".to_string();
    let err = data::load_tracts(&input).unwrap_err();
    assert!(format!("{:#}", err).contains("'NBHD'"));
}
