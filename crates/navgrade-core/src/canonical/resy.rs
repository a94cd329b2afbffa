//! Reservation-venue URLs of the form
//! `resy.com/cities/{city}/venues/{venue}?date=..&seats=..&time=..`.

use tracing::debug;

use super::time::ClockTime;
use super::{parse_query, raw_query, split_url, strip_scheme_and_www};

pub const DOMAIN: &str = "resy.com";

/// Which query parameters take part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyMatchKeys {
    /// `date`, `seats` and `time`.
    Strict,
    /// `date` only: the whole day shows no online availability, so party
    /// size and time cannot matter.
    Relaxed,
    /// `date` and `seats`: the base a conditional time check starts from.
    WithoutTime,
}

impl ResyMatchKeys {
    fn keys(self) -> &'static [&'static str] {
        match self {
            ResyMatchKeys::Strict => &["date", "seats", "time"],
            ResyMatchKeys::Relaxed => &["date"],
            ResyMatchKeys::WithoutTime => &["date", "seats"],
        }
    }
}

/// Canonical form of a venue URL under the given key set.
pub fn canonicalize(url: &str, keys: ResyMatchKeys) -> String {
    if url.is_empty() {
        return String::new();
    }
    let parts = split_url(&strip_scheme_and_www(url));
    if !parts.netloc.contains(DOMAIN) {
        return parts.minimal();
    }

    let segments: Vec<&str> = parts.path.split('/').filter(|s| !s.is_empty()).collect();
    let after = |marker: &str| {
        segments
            .iter()
            .position(|s| *s == marker)
            .and_then(|i| segments.get(i + 1))
            .copied()
    };

    let mut out = match (after("cities"), after("venues")) {
        (Some(city), Some(venue)) => format!("{}/cities/{city}/venues/{venue}", parts.netloc),
        _ => {
            debug!(url = %url, "venue url without city/venue segments");
            format!("{}{}", parts.netloc, parts.path.trim_end_matches('/'))
        }
    };

    let params = parse_query(&parts.query);
    let query: Vec<String> = keys
        .keys()
        .iter()
        .filter_map(|k| params.get(*k).and_then(|v| v.first()).map(|v| format!("{k}={v}")))
        .collect();
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query.join("&"));
    }
    out
}

/// The first parseable `time` parameter of a raw URL, normalized.
pub fn url_time(url: &str) -> Option<ClockTime> {
    parse_query(raw_query(url))
        .get("time")?
        .iter()
        .find_map(|v| ClockTime::parse_loose(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://resy.com/cities/new-york-ny/venues/carbone";

    #[test]
    fn test_param_order_and_extra_path_are_irrelevant() {
        let a = canonicalize(
            &format!("{BASE}?time=1900&seats=2&date=2025-06-01"),
            ResyMatchKeys::Strict,
        );
        let b = canonicalize(
            "https://www.resy.com/cities/new-york-ny/venues/carbone/?date=2025-06-01&seats=2&time=1900&utm=x",
            ResyMatchKeys::Strict,
        );
        assert_eq!(a, b);
        assert_eq!(
            a,
            "resy.com/cities/new-york-ny/venues/carbone?date=2025-06-01&seats=2&time=1900"
        );
    }

    #[test]
    fn test_relaxed_keeps_only_date() {
        let a = canonicalize(&format!("{BASE}?date=2025-06-01&seats=2&time=1900"), ResyMatchKeys::Relaxed);
        let b = canonicalize(&format!("{BASE}?date=2025-06-01&seats=6"), ResyMatchKeys::Relaxed);
        assert_eq!(a, b);
    }

    #[test]
    fn test_without_time_drops_time() {
        let c = canonicalize(&format!("{BASE}?date=2025-06-01&seats=2&time=1900"), ResyMatchKeys::WithoutTime);
        assert_eq!(c, "resy.com/cities/new-york-ny/venues/carbone?date=2025-06-01&seats=2");
    }

    #[test]
    fn test_missing_venue_falls_back_to_path() {
        let c = canonicalize("https://resy.com/cities/new-york-ny/?date=2025-06-01", ResyMatchKeys::Strict);
        assert_eq!(c, "resy.com/cities/new-york-ny?date=2025-06-01");
    }

    #[test]
    fn test_url_time() {
        assert_eq!(
            url_time(&format!("{BASE}?time=19%3A00")).map(|t| t.to_string()),
            Some("19:00:00".to_string())
        );
        assert_eq!(
            url_time(&format!("{BASE}?time=bad&time=1930")).map(|t| t.to_string()),
            Some("19:30:00".to_string())
        );
        assert_eq!(url_time(BASE), None);
    }
}
