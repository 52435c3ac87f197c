//! Typed accessors over the loosely shaped request tree.
//!
//! The tree is plain `serde_json::Value`; these helpers give callers an
//! explicit contract instead of panics or silent `None`s when a key holds
//! the wrong shape.

use serde_json::Value;

use crate::error::RequestError;

/// Numbers, or strings that parse as numbers. Query-folded scalars arrive as
/// strings, inline JSON as numbers; both are accepted everywhere a
/// coordinate or heading is read.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `Ok(None)` when the key is absent, `TypeMismatch` when it is present but
/// not a string.
pub fn optional_str<'t>(tree: &'t Value, key: &str) -> Result<Option<&'t str>, RequestError> {
    match tree.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(RequestError::TypeMismatch {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_f64_accepts_numbers_and_numeric_strings() {
        assert_eq!(lenient_f64(&json!(1.5)), Some(1.5));
        assert_eq!(lenient_f64(&json!("-42.25")), Some(-42.25));
        assert_eq!(lenient_f64(&json!(" 7 ")), Some(7.0));
        assert_eq!(lenient_f64(&json!("seven")), None);
        assert_eq!(lenient_f64(&json!([1.0])), None);
    }

    #[test]
    fn optional_str_distinguishes_missing_from_mistyped() {
        let tree = json!({"costing": "auto", "jsonp": 3});
        assert_eq!(optional_str(&tree, "costing").unwrap(), Some("auto"));
        assert_eq!(optional_str(&tree, "absent").unwrap(), None);
        assert!(matches!(
            optional_str(&tree, "jsonp"),
            Err(RequestError::TypeMismatch { .. })
        ));
    }
}
