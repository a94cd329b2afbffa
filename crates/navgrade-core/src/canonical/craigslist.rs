//! Craigslist search URLs compare by their query-parameter set alone.

use super::{parse_query, raw_query, QueryParams};

/// Parameters injected by the browser rather than chosen by the agent.
pub const IGNORED_PARAMS: &[&str] = &["isTrusted"];

/// The canonical parameter set of a search URL.
///
/// Host and path are not part of the comparison; values keep their case and
/// their order of appearance within a key.
pub fn param_set(url: &str) -> QueryParams {
    let mut params = parse_query(raw_query(url));
    params.retain(|k, _| !IGNORED_PARAMS.contains(&k.as_str()));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_order_is_irrelevant() {
        let a = param_set("https://sfbay.craigslist.org/search/apa?min_bedrooms=2&pets_dog=1");
        let b = param_set("https://sfbay.craigslist.org/search/apa?pets_dog=1&min_bedrooms=2");
        assert_eq!(a, b);
    }

    #[test]
    fn test_ignored_params_are_dropped() {
        let a = param_set("https://x.org/search?postal=94043&isTrusted=true");
        let b = param_set("https://x.org/search?postal=94043");
        assert_eq!(a, b);
    }

    #[test]
    fn test_extra_param_breaks_equality() {
        let a = param_set("https://x.org/search?postal=94043&search_distance=1");
        let b = param_set("https://x.org/search?postal=94043");
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_query_is_empty_set() {
        assert!(param_set("https://x.org/search").is_empty());
        assert!(param_set("").is_empty());
    }
}
