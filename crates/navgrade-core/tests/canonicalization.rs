use navgrade_core::canonical::resy::{canonicalize as resy_canonical, url_time, ResyMatchKeys};
use navgrade_core::canonical::time::ClockTime;
use navgrade_core::canonical::{apartments, craigslist};

#[test]
fn test_craigslist_parameter_order_and_host_do_not_matter() {
    let a = craigslist::param_set(
        "https://sfbay.craigslist.org/search/apa?min_bedrooms=2&max_price=3000",
    );
    let b = craigslist::param_set(
        "https://sfbay.craigslist.org/search/sfc/apa?max_price=3000&min_bedrooms=2#search=1",
    );
    assert_eq!(a, b);
}

#[test]
fn test_craigslist_values_must_match_exactly() {
    let a = craigslist::param_set("https://x.craigslist.org/search/apa?min_bedrooms=2");
    let b = craigslist::param_set("https://x.craigslist.org/search/apa?min_bedrooms=3");
    assert_ne!(a, b);
}

#[test]
fn test_apartments_location_order_is_irrelevant() {
    let a = apartments::canonicalize(
        "https://www.apartments.com/chelsea-new-york-ny/?n=soho-new-york-ny+tribeca-new-york-ny",
    );
    let b = apartments::canonicalize(
        "https://www.apartments.com/tribeca-new-york-ny/?n=chelsea-new-york-ny+soho-new-york-ny",
    );
    assert_eq!(a, b);
}

#[test]
fn test_apartments_case_scheme_and_trailing_slash() {
    let a = apartments::canonicalize("HTTPS://WWW.Apartments.com/Chelsea-New-York-NY/");
    let b = apartments::canonicalize("apartments.com/chelsea-new-york-ny");
    assert_eq!(a, b);
}

#[test]
fn test_apartments_volatile_params_are_dropped() {
    let a = apartments::canonicalize("https://www.apartments.com/chelsea-new-york-ny/?bb=abc&ss=1");
    let b = apartments::canonicalize("https://www.apartments.com/chelsea-new-york-ny/");
    assert_eq!(a, b);
}

#[test]
fn test_resy_key_sets_narrow_progressively() {
    let url = "https://resy.com/cities/new-york-ny/venues/lilia?seats=4&time=1930&date=2025-07-01";
    assert_eq!(
        resy_canonical(url, ResyMatchKeys::Strict),
        "resy.com/cities/new-york-ny/venues/lilia?date=2025-07-01&seats=4&time=1930"
    );
    assert_eq!(
        resy_canonical(url, ResyMatchKeys::WithoutTime),
        "resy.com/cities/new-york-ny/venues/lilia?date=2025-07-01&seats=4"
    );
    assert_eq!(
        resy_canonical(url, ResyMatchKeys::Relaxed),
        "resy.com/cities/new-york-ny/venues/lilia?date=2025-07-01"
    );
}

#[test]
fn test_resy_time_parameter_is_normalized() {
    assert_eq!(
        url_time("https://resy.com/cities/ny/venues/x?time=1830"),
        ClockTime::from_hms(18, 30, 0)
    );
    assert_eq!(url_time("https://resy.com/cities/ny/venues/x?date=2025-07-01"), None);
}

#[test]
fn test_empty_url_canonicalizes_to_empty() {
    assert_eq!(apartments::canonicalize(""), "");
    assert_eq!(resy_canonical("", ResyMatchKeys::Strict), "");
    assert!(craigslist::param_set("").is_empty());
}
