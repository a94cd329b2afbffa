//! Canonical JSON and goal digests.
//!
//! A stored result is only reused on resume when the digest of the goal it
//! was graded against matches the digest of the current goal. Digests are the
//! SHA-256 of a canonical JSON form: object keys sorted by UTF-16 code units,
//! integer-valued floats written as integers, compact separators.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::error::{GradeError, Result};

fn canonicalize_value(value: &serde_json::Value) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), canonicalize_value(v)?);
                }
            }
            Ok(serde_json::Value::Object(sorted))
        }
        serde_json::Value::Array(arr) => Ok(serde_json::Value::Array(
            arr.iter().map(canonicalize_value).collect::<Result<Vec<_>>>()?,
        )),
        serde_json::Value::Number(n) if !(n.is_i64() || n.is_u64()) => {
            let Some(f) = n.as_f64() else {
                return Ok(value.clone());
            };
            if !f.is_finite() {
                return Err(GradeError::config(
                    "NaN/Infinity not permitted in canonical JSON",
                ));
            }
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(serde_json::Value::Number(serde_json::Number::from(f as i64)))
            } else {
                Ok(value.clone())
            }
        }
        other => Ok(other.clone()),
    }
}

/// Render a JSON value in canonical form.
pub fn canonical_json(value: &serde_json::Value) -> Result<String> {
    let canonical = canonicalize_value(value)?;
    Ok(serde_json::to_string(&canonical)?)
}

/// SHA-256 hex digest of the canonical JSON of any serializable value.
pub fn compute_digest<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value)?;
    let canonical = canonical_json(&json)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_json_integer_float() {
        let input = serde_json::json!({ "party_sizes": [2.0, 4.0] });
        let canonical = canonical_json(&input).expect("canonical_json");
        assert_eq!(canonical, r#"{"party_sizes":[2,4]}"#);
    }

    #[test]
    fn test_canonical_json_fractional_float() {
        let input = serde_json::json!({ "score": 0.5 });
        let canonical = canonical_json(&input).expect("canonical_json");
        assert_eq!(canonical, r#"{"score":0.5}"#);
    }

    #[test]
    fn test_canonical_json_nested_field_order_invariant() {
        let a = serde_json::json!({ "eval": { "z": 1, "a": [ { "y": 2, "x": 1 } ] } });
        let b = serde_json::json!({ "eval": { "a": [ { "x": 1, "y": 2 } ], "z": 1 } });
        assert_eq!(
            canonical_json(&a).expect("a"),
            canonical_json(&b).expect("b")
        );
    }

    #[test]
    fn test_canonical_json_array_order_preserved() {
        let a = serde_json::json!({ "gt_urls": [["a"], ["b"]] });
        let b = serde_json::json!({ "gt_urls": [["b"], ["a"]] });
        assert_ne!(
            canonical_json(&a).expect("a"),
            canonical_json(&b).expect("b")
        );
    }

    #[test]
    fn test_compute_digest_is_stable_hex() {
        let input = serde_json::json!({ "evaluator": "craigslist_url_match", "gt_urls": [["x"]] });
        let d1 = compute_digest(&input).expect("digest");
        let d2 = compute_digest(&input).expect("digest");
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);
        assert!(d1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_compute_digest_single_field_delta() {
        let a = serde_json::json!({ "gt_url": "https://www.apartments.com/a/" });
        let b = serde_json::json!({ "gt_url": "https://www.apartments.com/b/" });
        assert_ne!(
            compute_digest(&a).expect("a"),
            compute_digest(&b).expect("b")
        );
    }
}
