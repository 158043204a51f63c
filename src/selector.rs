//! Cascading dropdown options: state, then county, then city, then neighborhood.
//!
//! Each level only offers values reachable under the coarser choices, so a
//! resolved [`FilterSelection`] can never name a combination absent from the data.

use crate::types::{FilterSelection, SelectionQuery, TractFeature};
use serde::Serialize;
use std::collections::BTreeSet;

/// Sorted, deduplicated values of `field` among features accepted by `keep`.
fn distinct<'a, K, F>(features: &'a [TractFeature], keep: K, field: F) -> Vec<String>
where
    K: Fn(&TractFeature) -> bool,
    F: Fn(&'a TractFeature) -> &'a str,
{
    features
        .iter()
        .filter(|f| keep(*f))
        .map(field)
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn states(features: &[TractFeature]) -> Vec<String> {
    distinct(features, |_| true, |f| f.state.as_str())
}

pub fn counties(features: &[TractFeature], state: &str) -> Vec<String> {
    distinct(features, |f| f.state == state, |f| f.county.as_str())
}

pub fn cities(features: &[TractFeature], state: &str, county: &str) -> Vec<String> {
    distinct(
        features,
        |f| f.state == state && f.county == county,
        |f| f.city.as_str(),
    )
}

pub fn neighborhoods(features: &[TractFeature], state: &str, county: &str, city: &str) -> Vec<String> {
    distinct(
        features,
        |f| f.state == state && f.county == county && f.city == city,
        |f| f.name.as_str(),
    )
}

/// Every dropdown's options plus the selection they settle on.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub states: Vec<String>,
    pub counties: Vec<String>,
    pub cities: Vec<String>,
    pub neighborhoods: Vec<String>,
    /// `None` only when some level has no options at all.
    pub selection: Option<FilterSelection>,
}

/// Keep the requested value if it is still offered, otherwise take the first option.
fn pick(options: &[String], requested: Option<&str>) -> Option<String> {
    requested
        .and_then(|wanted| options.iter().find(|o| o.as_str() == wanted))
        .or_else(|| options.first())
        .cloned()
}

/// Turn raw request parameters into a reachable selection.
///
/// Stale or unknown coarse values fall back to the first option of their
/// dropdown; a stale or empty neighborhood becomes "none selected".
pub fn resolve(features: &[TractFeature], query: &SelectionQuery) -> Resolution {
    let states = states(features);
    let mut resolution = Resolution {
        states,
        counties: Vec::new(),
        cities: Vec::new(),
        neighborhoods: Vec::new(),
        selection: None,
    };

    let Some(state) = pick(&resolution.states, query.state.as_deref()) else {
        return resolution;
    };
    resolution.counties = counties(features, &state);

    let Some(county) = pick(&resolution.counties, query.county.as_deref()) else {
        return resolution;
    };
    resolution.cities = cities(features, &state, &county);

    let Some(city) = pick(&resolution.cities, query.city.as_deref()) else {
        return resolution;
    };
    resolution.neighborhoods = neighborhoods(features, &state, &county, &city);

    let neighborhood = query
        .neighborhood
        .as_deref()
        .filter(|wanted| resolution.neighborhoods.iter().any(|n| n == wanted))
        .map(str::to_string);

    resolution.selection = Some(FilterSelection { state, county, city, neighborhood });
    resolution
}
