use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One census tract, reprojected to EPSG:4326.
#[derive(Debug, Clone)]
pub struct TractFeature {
    pub geoid: String,
    pub name: String,
    pub city: String,
    pub county: String,
    pub state: String,
    /// Geodesic area in square kilometers, when derivation is enabled.
    pub area_sqkm: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}

/// A complete, reachable dropdown selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub state: String,
    pub county: String,
    pub city: String,
    pub neighborhood: Option<String>,
}

/// Raw request parameters, before they are checked against the data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionQuery {
    pub state: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub basemap: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Basemap {
    #[serde(rename = "OpenStreetMap")]
    OpenStreetMap,
    #[serde(rename = "CartoDB positron")]
    CartoDbPositron,
    #[serde(rename = "Stamen Terrain")]
    StamenTerrain,
    #[serde(rename = "Stamen Toner")]
    StamenToner,
}

impl Basemap {
    pub const ALL: [Basemap; 4] = [
        Basemap::OpenStreetMap,
        Basemap::CartoDbPositron,
        Basemap::StamenTerrain,
        Basemap::StamenToner,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Basemap::OpenStreetMap => "OpenStreetMap",
            Basemap::CartoDbPositron => "CartoDB positron",
            Basemap::StamenTerrain => "Stamen Terrain",
            Basemap::StamenToner => "Stamen Toner",
        }
    }

    pub fn tile_url(self) -> &'static str {
        match self {
            Basemap::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            Basemap::CartoDbPositron => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
            }
            Basemap::StamenTerrain => {
                "https://tiles.stadiamaps.com/tiles/stamen_terrain/{z}/{x}/{y}{r}.png"
            }
            Basemap::StamenToner => {
                "https://tiles.stadiamaps.com/tiles/stamen_toner/{z}/{x}/{y}{r}.png"
            }
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            Basemap::OpenStreetMap => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
            }
            Basemap::CartoDbPositron => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>"
            }
            Basemap::StamenTerrain | Basemap::StamenToner => {
                "&copy; <a href=\"https://stadiamaps.com/\">Stadia Maps</a> &copy; <a href=\"https://stamen.com/\">Stamen Design</a> &copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
            }
        }
    }
}

impl FromStr for Basemap {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Basemap::ALL
            .into_iter()
            .find(|b| b.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("Unknown basemap: {}", s))
    }
}

/// How the filtered subset is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// One layer for the whole subset.
    Batched,
    /// One layer per tract, each with its own annotation.
    PerFeature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Tooltip,
    Popup,
}
