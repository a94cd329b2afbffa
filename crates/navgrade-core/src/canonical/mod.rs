//! URL canonicalization.
//!
//! Every canonicalizer is a pure function from a raw URL to a comparable
//! string: lower-cased, scheme and `www.` stripped, volatile parameters
//! dropped, query keys sorted, trailing slash removed. Domain modules add
//! their own semantic rewrites on top of the shared helpers here.

pub mod apartments;
pub mod craigslist;
pub mod resy;
pub mod time;

use std::collections::BTreeMap;

/// Multi-valued query parameters, keys sorted.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// The three pieces of a URL that take part in comparisons. The fragment is
/// always discarded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParts {
    pub netloc: String,
    pub path: String,
    pub query: String,
}

impl UrlParts {
    /// `netloc + path[?query]` with a trailing slash removed: the form used
    /// for hosts outside a canonicalizer's domain.
    pub fn minimal(&self) -> String {
        let mut out = format!("{}{}", self.netloc, self.path);
        if !self.query.is_empty() {
            out.push('?');
            out.push_str(&self.query);
        }
        out.trim_end_matches('/').to_string()
    }
}

/// Lower-case, trim, and strip a leading `http://`/`https://` and `www.`.
pub fn strip_scheme_and_www(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let rest = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    rest.strip_prefix("www.").unwrap_or(rest).to_string()
}

/// Split a scheme-less URL into host, path and query.
pub fn split_url(rest: &str) -> UrlParts {
    let rest = rest.split('#').next().unwrap_or_default();
    let (before_query, query) = match rest.split_once('?') {
        Some((b, q)) => (b, q),
        None => (rest, ""),
    };
    let (netloc, path) = match before_query.find('/') {
        Some(idx) => before_query.split_at(idx),
        None => (before_query, ""),
    };
    UrlParts {
        netloc: netloc.to_string(),
        path: path.to_string(),
        query: query.to_string(),
    }
}

/// Query string of a raw URL, as written (no lower-casing).
pub fn raw_query(url: &str) -> &str {
    let without_fragment = url.split('#').next().unwrap_or_default();
    without_fragment
        .split_once('?')
        .map(|(_, q)| q)
        .unwrap_or_default()
}

/// Parse a query string into multi-valued parameters.
///
/// Pairs without `=` and pairs with an empty value are dropped; `+` decodes
/// to a space and `%XX` escapes are decoded.
pub fn parse_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        params
            .entry(unquote_plus(key))
            .or_default()
            .push(unquote_plus(value));
    }
    params
}

/// Decode `+` as space, then `%XX` escapes. Invalid escapes are kept literally.
pub fn unquote_plus(s: &str) -> String {
    percent_decode(&s.replace('+', " "))
}

pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Form-encode one component: alphanumerics and `_.-~` pass through, space
/// becomes `+`, everything else is `%XX` (upper-case hex).
pub fn quote_plus(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Encode parameters in key order, one `k=v` pair per value.
pub fn encode_query(params: &QueryParams) -> String {
    params
        .iter()
        .flat_map(|(k, values)| {
            values
                .iter()
                .map(move |v| format!("{}={}", quote_plus(k), quote_plus(v)))
        })
        .collect::<Vec<_>>()
        .join("&")
}
