//! Field-path normalization.
//!
//! A field path addresses a value inside a record: `title`,
//! `content.blocks.2.heading`, `title.en`. Callers hand us strings, segment
//! arrays or (by mistake) objects; links must come out identical for the
//! same address every time.

use serde_json::{Number, Value};

/// Normalize a field path given in any accepted shape.
///
/// - string: whitespace removed, empty → `None`
/// - array of strings / finite numbers: joined with `.`; any other element
///   (or an empty segment) rejects the whole path
/// - object: rejected, key order is not stable
pub fn normalize_field_path(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_field_path_str(s),
        Value::Array(items) => {
            if items.is_empty() {
                return None;
            }
            let segments = items
                .iter()
                .map(segment)
                .collect::<Option<Vec<String>>>()?;
            Some(segments.join("."))
        }
        Value::Object(_) | Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

pub fn normalize_field_path_str(path: &str) -> Option<String> {
    let stripped: String = path.chars().filter(|c| !c.is_whitespace()).collect();
    Some(stripped).filter(|s| !s.is_empty())
}

fn segment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_field_path_str(s),
        Value::Number(n) => number_segment(n),
        _ => None,
    }
}

fn number_segment(n: &Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    let f = n.as_f64().filter(|f| f.is_finite())?;
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        Some(format!("{}", f as i64))
    } else {
        Some(f.to_string())
    }
}

/// Append `locale` as the last dotted segment unless it already is.
pub fn with_locale(path: &str, locale: Option<&str>) -> String {
    match locale.filter(|l| !l.is_empty()) {
        Some(locale) if path.rsplit('.').next() != Some(locale) => {
            format!("{}.{}", path, locale)
        }
        _ => path.to_string(),
    }
}
