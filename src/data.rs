use crate::config::{ColumnConfig, InputConfig};
use crate::projection::{self, Reprojector};
use crate::types::TractFeature;
use anyhow::{anyhow, Context, Result};
use geo::orient::{Direction, Orient};
use geo::{GeodesicArea, MultiPolygon};
use rayon::prelude::*;
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Reader, Shape};
use std::sync::OnceLock;
use tracing::{info, warn};

static TRACTS: OnceLock<Vec<TractFeature>> = OnceLock::new();

/// Load the tract collection into the process-wide cache.
///
/// Only the first call reads the shapefile. Later calls return the cached
/// collection, whatever config they are given.
pub fn init(input: &InputConfig) -> Result<&'static [TractFeature]> {
    if let Some(tracts) = TRACTS.get() {
        return Ok(tracts);
    }
    let loaded = load_tracts(input)?;
    Ok(TRACTS.get_or_init(|| loaded))
}

/// The cached collection, if `init` has completed.
pub fn tracts() -> Option<&'static [TractFeature]> {
    TRACTS.get().map(Vec::as_slice)
}

/// Attributes and source-CRS geometry of one record, before reprojection.
struct RawTract {
    geoid: String,
    name: String,
    city: String,
    county: String,
    state: String,
    geometry: MultiPolygon<f64>,
}

/// Read, reproject and (optionally) measure every tract in the shapefile.
pub fn load_tracts(input: &InputConfig) -> Result<Vec<TractFeature>> {
    info!("Loading tracts from {:?}...", input.shapefile);

    let crs = projection::detect(&input.shapefile, input.source_crs.as_deref())?;
    let reprojector = Reprojector::new(&crs)?;

    let raw = read_raw_tracts(input)?;

    let tracts = raw
        .into_par_iter()
        .map(|raw| {
            let geometry = reprojector
                .reproject(&raw.geometry)
                .with_context(|| format!("Failed to reproject tract {}", raw.geoid))?;
            let area_sqkm = input.compute_area.then(|| area_sqkm(&geometry));
            Ok(TractFeature {
                geoid: raw.geoid,
                name: raw.name,
                city: raw.city,
                county: raw.county,
                state: raw.state,
                area_sqkm,
                geometry,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Loaded {} tracts", tracts.len());
    Ok(tracts)
}

fn read_raw_tracts(input: &InputConfig) -> Result<Vec<RawTract>> {
    let mut reader = Reader::from_path(&input.shapefile)
        .with_context(|| format!("Failed to open Shapefile: {:?}", input.shapefile))?;
    let columns = &input.columns;

    let mut raw = Vec::new();
    let mut skipped_unplaced = 0usize;
    let mut skipped_shapes = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape+record")?;
        let attrs = read_attributes(&record, columns)?;

        let geometry = match shape {
            Shape::Polygon(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon.try_into()
                    .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?;
                geo_polygon
            }
            Shape::PolygonM(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon.try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?;
                geo_polygon
            }
            Shape::PolygonZ(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon.try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?;
                geo_polygon
            }
            _ => {
                skipped_shapes += 1;
                continue;
            }
        };

        let Some((geoid, name, city, county, state)) = attrs else {
            skipped_unplaced += 1;
            continue;
        };

        raw.push(RawTract { geoid, name, city, county, state, geometry });
    }

    if skipped_unplaced > 0 {
        warn!("Skipped {} records with no state, county or city", skipped_unplaced);
    }
    if skipped_shapes > 0 {
        warn!("Skipped {} non-polygon shapes", skipped_shapes);
    }

    Ok(raw)
}

/// Geodesic area in km². Shapefile exteriors wind clockwise, which the
/// geodesic measure reads as the rest of the globe, so orient first.
fn area_sqkm(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.orient(Direction::Default).geodesic_area_unsigned() / 1_000_000.0
}

type Attributes = (String, String, String, String, String);

/// `None` when the record cannot be reached from the dropdowns.
fn read_attributes(record: &Record, columns: &ColumnConfig) -> Result<Option<Attributes>> {
    let geoid = field_text(record, &columns.geoid)?.unwrap_or_default();
    let name = field_text(record, &columns.name)?.unwrap_or_default();
    let city = field_text(record, &columns.city)?;
    let county = field_text(record, &columns.county)?;
    let state = field_text(record, &columns.state)?;

    Ok(match (city, county, state) {
        (Some(city), Some(county), Some(state)) => Some((geoid, name, city, county, state)),
        _ => None,
    })
}

fn field_text(record: &Record, column: &str) -> Result<Option<String>> {
    let value = record
        .get(column)
        .ok_or_else(|| anyhow!("Column '{}' not found in Shapefile", column))?;

    let text = match value {
        FieldValue::Character(s) => s.as_deref().map(str::trim).map(str::to_string),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(n) => n.map(format_number),
        FieldValue::Float(f) => f.map(|f| format_number(f as f64)),
        FieldValue::Double(d) => Some(format_number(*d)),
        FieldValue::Integer(i) => Some(i.to_string()),
        other => return Err(anyhow!("Column '{}' has unsupported type: {:?}", column, other)),
    };

    Ok(text.filter(|s| !s.is_empty()))
}

/// Numeric GEOIDs are stored as floats in dBase; print whole numbers without a fraction.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
