use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj, transform::transform};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";
const NAD83: &str = "+proj=longlat +datum=NAD83 +no_defs +type=crs";
const WEB_MERCATOR: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs";
const CONUS_ALBERS: &str =
    "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs +type=crs";
const USA_CONTIGUOUS_ALBERS: &str =
    "+proj=aea +lat_0=37.5 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs +type=crs";

/// Coordinate system of the source shapefile, as a PROJ.4 definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCrs {
    pub proj4: String,
    /// Coordinates are degrees of longitude/latitude rather than meters.
    pub geographic: bool,
}

impl SourceCrs {
    pub fn wgs84() -> Self {
        Self { proj4: WGS84.to_string(), geographic: true }
    }

    pub fn is_wgs84(&self) -> bool {
        self.proj4 == WGS84
    }

    pub fn from_epsg(code: u32) -> Result<Self> {
        let crs = match code {
            4326 => Self::wgs84(),
            4269 => Self { proj4: NAD83.to_string(), geographic: true },
            3857 | 900913 => Self::projected(WEB_MERCATOR),
            5070 => Self::projected(CONUS_ALBERS),
            102003 => Self::projected(USA_CONTIGUOUS_ALBERS),
            32601..=32660 => utm(code - 32600, true, "WGS84"),
            32701..=32760 => utm(code - 32700, false, "WGS84"),
            26901..=26923 => utm(code - 26900, true, "NAD83"),
            _ => bail!("Unsupported EPSG code {}; set input.source_crs to a PROJ.4 string", code),
        };
        Ok(crs)
    }

    /// Parse a user override: `EPSG:<code>`, `ESRI:<code>` or a raw PROJ.4 string.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.starts_with('+') {
            let geographic = spec.contains("+proj=longlat") || spec.contains("+proj=latlong");
            return Ok(Self { proj4: spec.to_string(), geographic });
        }
        let code = spec
            .split_once(':')
            .map(|(_, code)| code)
            .unwrap_or(spec)
            .parse::<u32>()
            .with_context(|| format!("Invalid CRS '{}': expected EPSG:<code> or a PROJ.4 string", spec))?;
        Self::from_epsg(code)
    }

    /// Recognize the common ESRI/OGC WKT definitions found in `.prj` sidecars.
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let upper = wkt.trim().to_ascii_uppercase();
        let is_nad83 = [
            "NAD_1983",
            "NAD83",
            "NORTH_AMERICAN_1983",
            "NORTH_AMERICAN_DATUM_1983",
            "NORTH AMERICAN DATUM 1983",
        ]
        .iter()
        .any(|needle| upper.contains(needle));

        if upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS") {
            if is_nad83 {
                return Self::from_epsg(4269);
            }
            if !upper.contains("WGS") {
                warn!("Unrecognized geographic datum, treating as WGS84");
            }
            return Ok(Self::wgs84());
        }

        if !(upper.starts_with("PROJCS") || upper.starts_with("PROJCRS")) {
            bail!("Unrecognized WKT coordinate system");
        }

        if upper.contains("MERCATOR_AUXILIARY_SPHERE")
            || upper.contains("PSEUDO-MERCATOR")
            || upper.contains("PSEUDO_MERCATOR")
        {
            return Self::from_epsg(3857);
        }

        static UTM: OnceLock<Regex> = OnceLock::new();
        let utm_re = UTM.get_or_init(|| {
            Regex::new(r"UTM[_ ]ZONE[_ ](\d{1,2})([NS])").expect("valid UTM regex")
        });
        if let Some(caps) = utm_re.captures(&upper) {
            let zone: u32 = caps[1].parse()?;
            let north = &caps[2] == "N";
            let datum = if is_nad83 && north { "NAD83" } else { "WGS84" };
            if !(1..=60).contains(&zone) {
                bail!("UTM zone {} out of range", zone);
            }
            return Ok(utm(zone, north, datum));
        }

        if upper.contains("ALBERS") {
            if upper.contains("CONUS") || upper.contains("USGS_VERSION") {
                return Self::from_epsg(5070);
            }
            if upper.contains("USA_CONTIGUOUS_ALBERS") {
                return Self::from_epsg(102003);
            }
        }

        bail!("Unsupported projected coordinate system; set input.source_crs")
    }

    fn projected(proj4: &str) -> Self {
        Self { proj4: proj4.to_string(), geographic: false }
    }
}

fn utm(zone: u32, north: bool, datum: &str) -> SourceCrs {
    let south = if north { "" } else { " +south" };
    SourceCrs::projected(&format!(
        "+proj=utm +zone={zone}{south} +datum={datum} +units=m +no_defs +type=crs"
    ))
}

/// Resolve the source CRS: explicit override first, then the `.prj` sidecar.
pub fn detect(shapefile: &Path, source_override: Option<&str>) -> Result<SourceCrs> {
    if let Some(spec) = source_override {
        let crs = SourceCrs::parse(spec)?;
        info!("Using configured source CRS: {}", crs.proj4);
        return Ok(crs);
    }

    let prj_path = shapefile.with_extension("prj");
    let wkt = fs::read_to_string(&prj_path).with_context(|| {
        format!("No CRS for {:?}: missing {:?} and input.source_crs is unset", shapefile, prj_path)
    })?;
    let crs = SourceCrs::from_wkt(&wkt)
        .with_context(|| format!("Failed to interpret {:?}", prj_path))?;
    info!("Detected source CRS from {:?}: {}", prj_path, crs.proj4);
    Ok(crs)
}

/// Transforms geometries from a source CRS into WGS84 lon/lat degrees.
pub struct Reprojector {
    projs: Option<(Proj, Proj)>,
    geographic: bool,
}

impl Reprojector {
    pub fn new(source: &SourceCrs) -> Result<Self> {
        if source.is_wgs84() {
            return Ok(Self { projs: None, geographic: true });
        }

        let from = Proj::from_proj_string(&source.proj4)
            .map_err(|e| anyhow!("Failed to build source PROJ.4 '{}': {:?}", source.proj4, e))?;
        let to = Proj::from_proj_string(WGS84)
            .map_err(|e| anyhow!("Failed to build WGS84 PROJ.4: {:?}", e))?;

        Ok(Self { projs: Some((from, to)), geographic: source.geographic })
    }

    pub fn reproject(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        let Some((from, to)) = &self.projs else {
            return Ok(shape.clone());
        };
        let geographic = self.geographic;

        // proj4rs works in radians for geographic systems.
        shape.try_map_coords(move |coord: Coord<f64>| {
            let mut point = if geographic {
                (coord.x.to_radians(), coord.y.to_radians(), 0.0)
            } else {
                (coord.x, coord.y, 0.0)
            };
            transform(from, to, &mut point)
                .map_err(|e| anyhow!("CRS transform failed at ({}, {}): {:?}", coord.x, coord.y, e))?;
            Ok(Coord { x: point.0.to_degrees(), y: point.1.to_degrees() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Centroid};

    const ESRI_WGS84: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
    const ESRI_NAD83: &str = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
    const ESRI_WEB_MERCATOR: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;
    const ESRI_UTM18N: &str = r#"PROJCS["NAD_1983_UTM_Zone_18N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]]],PROJECTION["Transverse_Mercator"],UNIT["Meter",1.0]]"#;

    #[test]
    fn recognizes_common_prj_files() {
        assert!(SourceCrs::from_wkt(ESRI_WGS84).unwrap().is_wgs84());

        let nad83 = SourceCrs::from_wkt(ESRI_NAD83).unwrap();
        assert!(nad83.geographic);
        assert!(nad83.proj4.contains("NAD83"));

        let merc = SourceCrs::from_wkt(ESRI_WEB_MERCATOR).unwrap();
        assert_eq!(merc, SourceCrs::from_epsg(3857).unwrap());

        let utm = SourceCrs::from_wkt(ESRI_UTM18N).unwrap();
        assert!(utm.proj4.contains("+zone=18"));
        assert!(utm.proj4.contains("NAD83"));
        assert!(!utm.geographic);
    }

    #[test]
    fn rejects_unknown_projection() {
        let wkt = r#"PROJCS["NAD_1983_StatePlane_Pennsylvania_South_FIPS_3702_Feet",PROJECTION["Lambert_Conformal_Conic"]]"#;
        assert!(SourceCrs::from_wkt(wkt).is_err());
        assert!(SourceCrs::parse("EPSG:2272").is_err());
    }

    #[test]
    fn parses_overrides() {
        assert!(SourceCrs::parse("EPSG:4326").unwrap().is_wgs84());
        assert_eq!(SourceCrs::parse("epsg:32618").unwrap().proj4, utm(18, true, "WGS84").proj4);
        let raw = SourceCrs::parse("+proj=longlat +ellps=GRS80 +no_defs").unwrap();
        assert!(raw.geographic);
        assert!(SourceCrs::parse("EPSG:abc").is_err());
    }

    #[test]
    fn wgs84_is_identity() {
        let shape = MultiPolygon::new(vec![polygon![
            (x: -75.1, y: 40.0), (x: -75.0, y: 40.0), (x: -75.0, y: 40.1), (x: -75.1, y: 40.0)
        ]]);
        let reprojector = Reprojector::new(&SourceCrs::wgs84()).unwrap();
        assert_eq!(reprojector.reproject(&shape).unwrap(), shape);
    }

    #[test]
    fn web_mercator_to_lon_lat() {
        let radius = 6378137.0_f64;
        let forward = |lon: f64, lat: f64| {
            let x = lon.to_radians() * radius;
            let y = radius * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
            (x, y)
        };
        let (x0, y0) = forward(-75.2, 40.0);
        let (x1, y1) = forward(-75.0, 40.2);
        let shape = MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)
        ]]);

        let reprojector = Reprojector::new(&SourceCrs::from_epsg(3857).unwrap()).unwrap();
        let projected = reprojector.reproject(&shape).unwrap();
        let first = projected.0[0].exterior().0[0];
        assert!((first.x - -75.2).abs() < 1e-6, "lon {}", first.x);
        assert!((first.y - 40.0).abs() < 1e-6, "lat {}", first.y);

        let centroid = projected.centroid().unwrap();
        assert!((centroid.x() - -75.1).abs() < 1e-3);
        assert!(centroid.y() > 40.0 && centroid.y() < 40.2);
    }
}
