use crate::types::{FilterSelection, TractFeature};

/// Tracts whose state, county and city all equal the selection exactly.
pub fn filter<'a>(features: &'a [TractFeature], selection: &FilterSelection) -> Vec<&'a TractFeature> {
    features
        .iter()
        .filter(|f| {
            f.state == selection.state && f.county == selection.county && f.city == selection.city
        })
        .collect()
}

/// Narrow an already filtered subset to one neighborhood.
pub fn by_neighborhood<'a>(subset: &[&'a TractFeature], name: &str) -> Vec<&'a TractFeature> {
    subset.iter().copied().filter(|f| f.name == name).collect()
}

/// The subset a selection ultimately points at: its neighborhood when one is
/// chosen, otherwise the whole state/county/city match.
pub fn selected<'a>(features: &'a [TractFeature], selection: &FilterSelection) -> Vec<&'a TractFeature> {
    let subset = filter(features, selection);
    match &selection.neighborhood {
        Some(name) => by_neighborhood(&subset, name),
        None => subset,
    }
}
