use crate::types::{AnnotationKind, Basemap, DrawMode};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub shapefile: PathBuf,
    /// `EPSG:<code>` or a PROJ.4 string. Falls back to the `.prj` sidecar.
    pub source_crs: Option<String>,
    #[serde(default)]
    pub compute_area: bool,
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// dBase column names for each tract attribute.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnConfig {
    pub geoid: String,
    pub name: String,
    pub city: String,
    pub county: String,
    pub state: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            geoid: "GEOID".to_string(),
            name: "Name".to_string(),
            city: "City".to_string(),
            county: "County".to_string(),
            state: "State".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub title: String,
    pub basemap: Basemap,
    pub basemap_selector: bool,
    pub neighborhood_selector: bool,
    pub draw: DrawMode,
    pub annotation: AnnotationKind,
    pub tract_outline: bool,
    pub default_zoom: u8,
    pub neighborhood_zoom: u8,
    pub width: u32,
    pub height: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            title: "Neighborhood Visualizer".to_string(),
            basemap: Basemap::CartoDbPositron,
            basemap_selector: false,
            neighborhood_selector: true,
            draw: DrawMode::Batched,
            annotation: AnnotationKind::Tooltip,
            tract_outline: false,
            default_zoom: 12,
            neighborhood_zoom: 14,
            width: 1000,
            height: 600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
    }
}
