use crate::config::AppConfig;
use crate::filter;
use crate::page::{self, PageContext};
use crate::pipeline;
use crate::render;
use crate::selector::{self, Resolution};
use crate::types::{SelectionQuery, TractFeature};
use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use geo::{BoundingRect, Contains, Point};
use geojson::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// Wrapper for RTree indexing
pub struct TractIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for TractIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct Logo {
    bytes: Vec<u8>,
    mime: &'static str,
}

pub struct AppState {
    pub tracts: &'static [TractFeature],
    pub tree: RTree<TractIndex>,
    pub config: AppConfig,
    pub logo: Option<Logo>,
}

impl AppState {
    pub fn new(config: AppConfig, tracts: &'static [TractFeature]) -> Self {
        info!("Building spatial index for {} tracts...", tracts.len());
        let tree_items: Vec<TractIndex> = tracts
            .iter()
            .enumerate()
            .filter_map(|(i, tract)| {
                let rect = tract.geometry.bounding_rect()?;
                Some(TractIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        let tree = RTree::bulk_load(tree_items);

        let logo = config.input.logo.as_ref().and_then(|path| match load_logo(path) {
            Ok(logo) => Some(logo),
            Err(e) => {
                warn!("Ignoring logo: {:#}", e);
                None
            }
        });

        Self { tracts, tree, config, logo }
    }
}

fn load_logo(path: &std::path::Path) -> Result<Logo> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read logo: {:?}", path))?;
    let format = image::guess_format(&bytes)
        .with_context(|| format!("Unrecognized image format: {:?}", path))?;
    Ok(Logo { bytes, mime: format.to_mime_type() })
}

/// anyhow errors surface as a plain 500.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Deserialize)]
pub struct IdentifyParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct TractSummary {
    geoid: String,
    name: String,
    city: String,
    county: String,
    state: String,
    area_sqkm: Option<f64>,
}

impl From<&TractFeature> for TractSummary {
    fn from(tract: &TractFeature) -> Self {
        Self {
            geoid: tract.geoid.clone(),
            name: tract.name.clone(),
            city: tract.city.clone(),
            county: tract.county.clone(),
            state: tract.state.clone(),
            area_sqkm: tract.area_sqkm,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/options", get(options_handler))
        .route("/api/tracts", get(tracts_handler))
        .route("/api/tracts.csv", get(tracts_csv_handler))
        .route("/api/identify", get(identify_handler))
        .route("/logo", get(logo_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, tracts: &'static [TractFeature]) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, tracts));
    let app = router(state);

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
) -> Result<Html<String>, AppError> {
    let view = pipeline::run(state.tracts, &state.config.map, &query);
    let html = page::dashboard(&PageContext {
        map: &state.config.map,
        resolution: &view.resolution,
        basemap: view.basemap,
        has_logo: state.logo.is_some(),
        outcome: &view.outcome,
    })?;
    Ok(Html(html))
}

async fn options_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
) -> Json<Resolution> {
    Json(selector::resolve(state.tracts, &query))
}

/// Tracts the query points at; empty when nothing is selectable.
fn selected_tracts<'a>(tracts: &'a [TractFeature], query: &SelectionQuery) -> Vec<&'a TractFeature> {
    match selector::resolve(tracts, query).selection {
        Some(selection) => filter::selected(tracts, &selection),
        None => Vec::new(),
    }
}

async fn tracts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
) -> Json<FeatureCollection> {
    let subset = selected_tracts(state.tracts, &query);
    Json(render::feature_collection(&subset, |_| None))
}

async fn tracts_csv_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let subset = selected_tracts(state.tracts, &query);
    let body = tracts_to_csv(&subset)?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}

pub fn tracts_to_csv(tracts: &[&TractFeature]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["GEOID", "Name", "City", "County", "State", "Area"])?;
    for tract in tracts {
        let area = tract.area_sqkm.map(|a| a.to_string()).unwrap_or_default();
        writer.write_record([
            tract.geoid.as_str(),
            tract.name.as_str(),
            tract.city.as_str(),
            tract.county.as_str(),
            tract.state.as_str(),
            area.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

async fn identify_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdentifyParams>,
) -> Json<Option<TractSummary>> {
    let point = Point::new(params.lon, params.lat);
    let envelope = AABB::from_point([params.lon, params.lat]);

    // Query RTree
    let candidates = state.tree.locate_in_envelope_intersecting(&envelope);

    for candidate in candidates {
        if let Some(tract) = state.tracts.get(candidate.index) {
            if tract.geometry.contains(&point) {
                return Json(Some(TractSummary::from(tract)));
            }
        }
    }

    Json(None)
}

async fn logo_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.logo {
        Some(logo) => ([(header::CONTENT_TYPE, logo.mime)], logo.bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
