use crate::config::MapConfig;
use crate::filter;
use crate::render::{self, RenderOptions, RenderOutcome};
use crate::selector::{self, Resolution};
use crate::types::{Basemap, SelectionQuery, TractFeature};

/// One full pass: resolve the dropdowns, filter, render.
pub struct DashboardView {
    pub resolution: Resolution,
    pub basemap: Basemap,
    pub outcome: RenderOutcome,
}

/// Requested basemap if recognized, else the configured default.
pub fn basemap_for(query: &SelectionQuery, map: &MapConfig) -> Basemap {
    query
        .basemap
        .as_deref()
        .and_then(|b| b.parse().ok())
        .unwrap_or(map.basemap)
}

pub fn run(tracts: &[TractFeature], map: &MapConfig, query: &SelectionQuery) -> DashboardView {
    let mut resolution = selector::resolve(tracts, query);
    if !map.neighborhood_selector {
        // No dropdown, so nothing can be highlighted.
        if let Some(selection) = resolution.selection.as_mut() {
            selection.neighborhood = None;
        }
    }
    let basemap = basemap_for(query, map);
    let options = RenderOptions::from_config(map, basemap);

    let outcome = match &resolution.selection {
        Some(selection) => {
            let subset = filter::filter(tracts, selection);
            render::render(&subset, selection.neighborhood.as_deref(), &options)
        }
        None => render::render(&[], None, &options),
    };

    DashboardView { resolution, basemap, outcome }
}
