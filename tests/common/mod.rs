#![allow(dead_code)]

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Writer};
use std::fs;
use std::path::{Path, PathBuf};
use tract_explorer::config::{ColumnConfig, InputConfig};

pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
pub const WEB_MERCATOR_PRJ: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;

/// (GEOID, Name, City, County, State, lower-left lon, lower-left lat)
pub const TRACTS: &[(&str, &str, &str, &str, &str, f64, f64)] = &[
    ("42101036100", "Fox Chase", "Philadelphia", "Philadelphia", "Pennsylvania", -75.08, 40.07),
    ("42101036200", "Fox Chase", "Philadelphia", "Philadelphia", "Pennsylvania", -75.07, 40.08),
    ("42101000100", "Center City", "Philadelphia", "Philadelphia", "Pennsylvania", -75.17, 39.95),
    ("42003020100", "Downtown", "Pittsburgh", "Allegheny", "Pennsylvania", -80.00, 40.44),
    ("36061000100", "SoHo", "New York", "New York", "New York", -74.00, 40.72),
];

pub const SIDE: f64 = 0.01;

fn web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let radius = 6378137.0_f64;
    let x = lon.to_radians() * radius;
    let y = radius * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn text(value: &str) -> FieldValue {
    FieldValue::Character(Some(value.to_string()))
}

/// Write the fixture tracts as a shapefile (with `.prj`) and return the `.shp` path.
pub fn write_fixture(dir: &Path, mercator: bool) -> PathBuf {
    let path = dir.join("Tracts_in_Neighborhoods.shp");

    let table = ["GEOID", "Name", "City", "County", "State"]
        .into_iter()
        .fold(TableWriterBuilder::new(), |builder, name| {
            builder.add_character_field(FieldName::try_from(name).unwrap(), 40)
        });
    let mut writer = Writer::from_path(&path, table).unwrap();

    for &(geoid, name, city, county, state, lon, lat) in TRACTS {
        let corner = |x: f64, y: f64| {
            let (x, y) = if mercator { web_mercator(x, y) } else { (x, y) };
            Point::new(x, y)
        };
        // Clockwise outer ring, as the format expects.
        let ring = vec![
            corner(lon, lat),
            corner(lon, lat + SIDE),
            corner(lon + SIDE, lat + SIDE),
            corner(lon + SIDE, lat),
            corner(lon, lat),
        ];
        let polygon = Polygon::new(PolygonRing::Outer(ring));

        let mut record = Record::default();
        record.insert("GEOID".to_string(), text(geoid));
        record.insert("Name".to_string(), text(name));
        record.insert("City".to_string(), text(city));
        record.insert("County".to_string(), text(county));
        record.insert("State".to_string(), text(state));

        writer.write_shape_and_record(&polygon, &record).unwrap();
    }
    drop(writer);

    let prj = if mercator { WEB_MERCATOR_PRJ } else { WGS84_PRJ };
    fs::write(path.with_extension("prj"), prj).unwrap();
    path
}

pub fn input_config(shapefile: PathBuf) -> InputConfig {
    InputConfig {
        shapefile,
        source_crs: None,
        compute_area: true,
        logo: None,
        columns: ColumnConfig::default(),
    }
}
