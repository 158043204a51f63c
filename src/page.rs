//! Server-rendered dashboard page: sidebar dropdowns and the map region.
//!
//! Every dropdown resubmits the form, so each interaction rebuilds the page
//! from the query string alone.

use crate::config::MapConfig;
use crate::render::RenderOutcome;
use crate::selector::Resolution;
use crate::types::Basemap;
use anyhow::{Context, Result};
use askama::Template;

struct OptionView<'a> {
    value: &'a str,
    selected: bool,
}

/// A `<select>` that resubmits the form on change.
struct SelectView<'a> {
    label: &'static str,
    name: &'static str,
    leading_blank: bool,
    options: Vec<OptionView<'a>>,
}

impl<'a> SelectView<'a> {
    fn new<I>(label: &'static str, name: &'static str, options: I, selected: Option<&str>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let options = options
            .into_iter()
            .map(|value| OptionView { value, selected: Some(value) == selected })
            .collect();
        Self { label, name, leading_blank: false, options }
    }

    fn with_leading_blank(mut self) -> Self {
        self.leading_blank = true;
        self
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    title: &'a str,
    has_logo: bool,
    selects: Vec<SelectView<'a>>,
    /// Carries the configured basemap through resubmits when there is no basemap dropdown.
    hidden_basemap: Option<&'static str>,
    /// "city, county, state" for the subheader.
    place: Option<String>,
    notice: Option<&'static str>,
    map_html: Option<String>,
}

pub struct PageContext<'a> {
    pub map: &'a MapConfig,
    pub resolution: &'a Resolution,
    pub basemap: Basemap,
    pub has_logo: bool,
    pub outcome: &'a RenderOutcome,
}

pub fn dashboard(ctx: &PageContext<'_>) -> Result<String> {
    let resolution = ctx.resolution;
    let selection = resolution.selection.as_ref();

    let mut selects = vec![
        SelectView::new("Select State", "state", resolution.states.iter().map(String::as_str), selection.map(|s| s.state.as_str())),
        SelectView::new("Select County", "county", resolution.counties.iter().map(String::as_str), selection.map(|s| s.county.as_str())),
        SelectView::new("Select City", "city", resolution.cities.iter().map(String::as_str), selection.map(|s| s.city.as_str())),
    ];
    if ctx.map.neighborhood_selector {
        selects.push(
            SelectView::new(
                "Jump to Neighborhood",
                "neighborhood",
                resolution.neighborhoods.iter().map(String::as_str),
                selection.and_then(|s| s.neighborhood.as_deref()),
            )
            .with_leading_blank(),
        );
    }
    let hidden_basemap = if ctx.map.basemap_selector {
        selects.push(SelectView::new(
            "Select Basemap",
            "basemap",
            Basemap::ALL.iter().map(|b| b.label()),
            Some(ctx.basemap.label()),
        ));
        None
    } else {
        Some(ctx.basemap.label())
    };

    let (notice, map_html) = match ctx.outcome {
        RenderOutcome::NoData(notice) => (Some(*notice), None),
        RenderOutcome::Map(view) => (None, Some(view.embed()?)),
    };

    let page = DashboardTemplate {
        title: &ctx.map.title,
        has_logo: ctx.has_logo,
        selects,
        hidden_basemap,
        place: selection.map(|s| format!("{}, {}, {}", s.city, s.county, s.state)),
        notice,
        map_html,
    };
    page.render().context("Failed to render dashboard")
}
