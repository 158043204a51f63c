use crate::config::MapConfig;
use crate::types::{AnnotationKind, Basemap, DrawMode, TractFeature};
use anyhow::{Context, Result};
use askama::Template;
use geo::Centroid;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::warn;

pub const NO_DATA_NOTICE: &str = "No neighborhoods found for the selected region. Try another one.";

const BASE_COLOR: &str = "#1f78b4";
const HOVER_COLOR: &str = "#08519c";
const HIGHLIGHT_COLOR: &str = "orange";
const POPUP_MAX_WIDTH: u32 = 300;

/// Leaflet path options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub color: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

impl Style {
    fn new(color: &str, weight: f64, fill_opacity: f64) -> Self {
        Self { color: color.to_string(), weight, fill_opacity: Some(fill_opacity) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub name: String,
    pub style: Style,
    /// Style applied while the pointer is over a feature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<Style>,
    /// How each feature's `annotation` property is attached, if at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationKind>,
    /// Popup width in pixels; only popups carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    pub data: FeatureCollection,
}

/// Everything the browser needs to draw one map.
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    /// `[latitude, longitude]`, Leaflet order.
    pub center: [f64; 2],
    pub zoom: u8,
    pub basemap: Basemap,
    pub tile_url: &'static str,
    pub attribution: &'static str,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    NoData(&'static str),
    Map(MapView),
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub basemap: Basemap,
    pub draw: DrawMode,
    pub annotation: AnnotationKind,
    pub tract_outline: bool,
    pub default_zoom: u8,
    pub neighborhood_zoom: u8,
    pub width: u32,
    pub height: u32,
}

impl RenderOptions {
    pub fn from_config(map: &MapConfig, basemap: Basemap) -> Self {
        Self {
            basemap,
            draw: map.draw,
            annotation: map.annotation,
            tract_outline: map.tract_outline,
            default_zoom: map.default_zoom,
            neighborhood_zoom: map.neighborhood_zoom,
            width: map.width,
            height: map.height,
        }
    }
}

fn max_width(annotation: Option<AnnotationKind>) -> Option<u32> {
    matches!(annotation, Some(AnnotationKind::Popup)).then_some(POPUP_MAX_WIDTH)
}

/// Mean of the per-tract centroids as `[lat, lon]`.
///
/// Tracts with empty geometry have no centroid and are left out of the mean.
/// `None` when no tract has one, including the empty set.
pub fn mean_centroid(features: &[&TractFeature]) -> Option<[f64; 2]> {
    let centroids: Vec<_> = features.iter().filter_map(|f| f.geometry.centroid()).collect();
    if centroids.is_empty() {
        return None;
    }
    let n = centroids.len() as f64;
    let lat = centroids.iter().map(|p| p.y()).sum::<f64>() / n;
    let lon = centroids.iter().map(|p| p.x()).sum::<f64>() / n;
    Some([lat, lon])
}

/// Build the map for a filtered subset, highlighting `highlight` when given.
pub fn render(subset: &[&TractFeature], highlight: Option<&str>, options: &RenderOptions) -> RenderOutcome {
    let Some(mut center) = mean_centroid(subset) else {
        if !subset.is_empty() {
            warn!("None of the {} selected tracts has geometry to center on", subset.len());
        }
        return RenderOutcome::NoData(NO_DATA_NOTICE);
    };
    let mut zoom = options.default_zoom;
    let mut layers = Vec::new();

    match options.draw {
        DrawMode::Batched => layers.push(Layer {
            name: "All Neighborhoods".to_string(),
            style: Style::new(BASE_COLOR, 1.0, 0.1),
            hover: None,
            annotation: None,
            max_width: None,
            data: feature_collection(subset, |_| None),
        }),
        DrawMode::PerFeature => {
            layers.extend(subset.iter().map(|tract| Layer {
                name: tract.name.clone(),
                style: Style::new(BASE_COLOR, 1.5, 0.2),
                hover: Some(Style { color: HOVER_COLOR.to_string(), weight: 2.5, fill_opacity: None }),
                annotation: Some(options.annotation),
                max_width: max_width(Some(options.annotation)),
                data: feature_collection(&[*tract], |f| Some(summary_annotation(f))),
            }));
        }
    }

    if options.tract_outline {
        layers.push(Layer {
            name: "Tracts".to_string(),
            style: Style::new("black", 0.15, 0.0),
            hover: None,
            annotation: None,
            max_width: None,
            data: feature_collection(subset, |_| None),
        });
    }

    if let Some(name) = highlight {
        let neighborhood: Vec<&TractFeature> = subset.iter().copied().filter(|f| f.name == name).collect();
        if let Some(neighborhood_center) = mean_centroid(&neighborhood) {
            center = neighborhood_center;
            zoom = options.neighborhood_zoom;
            layers.push(Layer {
                name: name.to_string(),
                style: Style::new(HIGHLIGHT_COLOR, 2.5, 0.5),
                hover: None,
                annotation: Some(options.annotation),
                max_width: max_width(Some(options.annotation)),
                data: feature_collection(&neighborhood, |f| Some(detail_annotation(f))),
            });
        }
    }

    RenderOutcome::Map(MapView {
        center,
        zoom,
        basemap: options.basemap,
        tile_url: options.basemap.tile_url(),
        attribution: options.basemap.attribution(),
        width: options.width,
        height: options.height,
        layers,
    })
}

/// GeoJSON for a subset; `annotate` supplies an optional `annotation` HTML property.
pub fn feature_collection<F>(features: &[&TractFeature], annotate: F) -> FeatureCollection
where
    F: Fn(&TractFeature) -> Option<String>,
{
    FeatureCollection {
        bbox: None,
        features: features.iter().map(|f| to_feature(f, annotate(f))).collect(),
        foreign_members: None,
    }
}

fn to_feature(tract: &TractFeature, annotation: Option<String>) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("GEOID".to_string(), JsonValue::from(tract.geoid.as_str()));
    properties.insert("Name".to_string(), JsonValue::from(tract.name.as_str()));
    properties.insert("City".to_string(), JsonValue::from(tract.city.as_str()));
    properties.insert("County".to_string(), JsonValue::from(tract.county.as_str()));
    properties.insert("State".to_string(), JsonValue::from(tract.state.as_str()));
    if let Some(area) = tract.area_sqkm {
        properties.insert("Area".to_string(), JsonValue::from(area));
    }
    if let Some(html) = annotation {
        properties.insert("annotation".to_string(), JsonValue::from(html));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&tract.geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

struct AnnotationRow {
    alias: &'static str,
    value: String,
}

#[derive(Template)]
#[template(
    source = "<table>{% for row in rows %}<tr><th>{{ row.alias }}</th><td>{{ row.value }}</td></tr>{% endfor %}</table>",
    ext = "html"
)]
struct DetailAnnotation {
    rows: Vec<AnnotationRow>,
}

#[derive(Template)]
#[template(
    source = "<b>Name:</b> {{ name }}<br><b>County:</b> {{ county }}<br><b>City:</b> {{ city }}<br><b>GEOID:</b> {{ geoid }}<br>",
    ext = "html"
)]
struct SummaryAnnotation<'a> {
    name: &'a str,
    county: &'a str,
    city: &'a str,
    geoid: &'a str,
}

/// Field table shown on the highlighted neighborhood.
fn detail_annotation(tract: &TractFeature) -> String {
    let mut rows = vec![
        AnnotationRow { alias: "Tract GEOID:", value: tract.geoid.clone() },
        AnnotationRow { alias: "Neighborhood:", value: tract.name.clone() },
        AnnotationRow { alias: "County:", value: tract.county.clone() },
        AnnotationRow { alias: "City:", value: tract.city.clone() },
        AnnotationRow { alias: "State:", value: tract.state.clone() },
    ];
    if let Some(area) = tract.area_sqkm {
        rows.push(AnnotationRow { alias: "Area (km²):", value: format!("{:.2}", area) });
    }
    DetailAnnotation { rows }.render().unwrap_or_default()
}

/// Short summary bound to each tract in per-feature mode.
fn summary_annotation(tract: &TractFeature) -> String {
    SummaryAnnotation {
        name: &tract.name,
        county: &tract.county,
        city: &tract.city,
        geoid: &tract.geoid,
    }
    .render()
    .unwrap_or_default()
}

/// JSON that is safe to inline inside a `<script>` element.
pub fn script_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("Failed to serialize map data")?;
    Ok(json.replace("</", "<\\/").replace("<!--", "<\\!--"))
}

#[derive(Template)]
#[template(path = "map_embed.html")]
struct MapEmbed {
    width: u32,
    height: u32,
    view_json: String,
}

#[derive(Template)]
#[template(path = "map_page.html")]
struct MapPage<'a> {
    title: &'a str,
    map_html: String,
}

impl MapView {
    /// The `map` container plus the script that fills it. Expects Leaflet on the page.
    pub fn embed(&self) -> Result<String> {
        let embed = MapEmbed { width: self.width, height: self.height, view_json: script_json(self)? };
        embed.render().context("Failed to render map")
    }

    /// Standalone document for `export`.
    pub fn to_html(&self, title: &str) -> Result<String> {
        let page = MapPage { title, map_html: self.embed()? };
        page.render().context("Failed to render map page")
    }
}
