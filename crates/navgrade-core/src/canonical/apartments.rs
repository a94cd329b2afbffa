//! Apartment-search URLs.
//!
//! Locations can sit in the path (`/chelsea-new-york-ny/`) or in the `n`
//! query parameter (`?n=a_city_ny+b_city_ny`), in any order. The canonical
//! form collects every location, sorts them, puts the first one in the path
//! and the rest in `n`.

use std::collections::BTreeSet;

use super::{encode_query, parse_query, split_url, strip_scheme_and_www};

pub const DOMAIN: &str = "apartments.com";

/// Volatile parameters (map viewport, session state).
pub const IGNORED_PARAMS: &[&str] = &["io", "ss", "bb"];

const STATE_ABBREVIATIONS: &[&str] = &[
    "ak", "al", "ar", "az", "ca", "co", "ct", "dc", "de", "fl", "ga", "hi", "ia", "id", "il", "in",
    "ks", "ky", "la", "ma", "md", "me", "mi", "mn", "mo", "ms", "mt", "nc", "nd", "ne", "nh", "nj",
    "nm", "nv", "ny", "oh", "ok", "or", "pa", "ri", "sc", "sd", "tn", "tx", "ut", "va", "vt", "wa",
    "wi", "wv", "wy",
];

const AMENITY_FEATURES: &[&str] = &[
    "air-conditioning",
    "dishwasher",
    "fitness-center",
    "garage",
    "gated",
    "laundry-facilities",
    "parking",
    "pool",
    "utilities-included",
    "walk-in-closets",
    "washer-dryer",
    "washer_dryer-hookup",
];

/// Canonical form of an apartment-search URL.
pub fn canonicalize(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let parts = split_url(&strip_scheme_and_www(url));
    if !parts.netloc.contains(DOMAIN) {
        return parts.minimal();
    }

    let mut locations = BTreeSet::new();
    let mut other_parts = Vec::new();
    for segment in parts.path.split('/').filter(|s| !s.is_empty()) {
        if is_location(segment) {
            locations.insert(segment.replace('_', "-"));
        } else {
            other_parts.push(sort_features(segment));
        }
    }

    let mut params = parse_query(&parts.query);
    params.retain(|k, _| !IGNORED_PARAMS.contains(&k.as_str()));
    if let Some(values) = params.remove("n") {
        if let Some(first) = values.first() {
            locations.extend(
                first
                    .split(|c: char| c == '+' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.replace('_', "-")),
            );
        }
    }

    let mut locations = locations.into_iter();
    let mut path_parts = Vec::with_capacity(other_parts.len() + 1);
    if let Some(primary) = locations.next() {
        path_parts.push(primary);
        let rest: Vec<String> = locations.collect();
        if !rest.is_empty() {
            params.insert("n".to_string(), vec![rest.join("+")]);
        }
    }
    path_parts.extend(other_parts);

    let mut out = parts.netloc;
    if !path_parts.is_empty() {
        out.push('/');
        out.push_str(&path_parts.join("/"));
    }
    if !params.is_empty() {
        out.push('?');
        out.push_str(&encode_query(&params));
    }
    out
}

/// A path segment names a location when it is hyphenated and ends in a state
/// code or another two-letter suffix (`area-city-st`).
fn is_location(segment: &str) -> bool {
    if !segment.contains('-') {
        return false;
    }
    let ends_with_state = STATE_ABBREVIATIONS
        .iter()
        .any(|st| segment.ends_with(&format!("-{st}")));
    let last_len = segment
        .rsplit('-')
        .next()
        .map(|s| s.chars().count())
        .unwrap_or(0);
    ends_with_state || last_len == 2
}

/// Sort amenity tokens embedded in a filter segment so that
/// `pool-dishwasher` and `dishwasher-pool` agree.
fn sort_features(segment: &str) -> String {
    if !AMENITY_FEATURES.iter().any(|f| segment.contains(f)) {
        return segment.to_string();
    }

    let mut by_length: Vec<&str> = AMENITY_FEATURES.to_vec();
    by_length.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut found = Vec::new();
    let mut remaining = segment.to_string();
    for feature in by_length {
        if remaining.contains(feature) {
            found.push(feature);
            remaining = remaining
                .replace(feature, "-")
                .replace("--", "-")
                .trim_matches('-')
                .to_string();
        }
    }
    found.sort_unstable();

    remaining
        .split('-')
        .filter(|p| !p.is_empty())
        .chain(found)
        .collect::<Vec<_>>()
        .join("-")
}
