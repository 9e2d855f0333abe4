use crate::codec::{contains_marker, strip};
use serde_json::Value;

/// Strip markers from every string inside a JSON document, in place.
///
/// Object keys are left alone. Returns the number of strings changed.
pub fn strip_value(value: &mut Value) -> usize {
    match value {
        Value::String(s) => {
            if contains_marker(s) {
                *s = strip(s);
                1
            } else {
                0
            }
        }
        Value::Array(items) => items.iter_mut().map(strip_value).sum(),
        Value::Object(map) => map.values_mut().map(strip_value).sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::combine;
    use serde_json::json;

    #[test]
    fn test_strip_nested_response() {
        let title = combine("Title", &json!({ "itemId": "1" })).unwrap();
        let alt = combine("A cat", &json!({ "itemId": "2" })).unwrap();

        let mut response = json!({
            "post": {
                "title": title,
                "cover": { "alt": alt, "width": 640 },
                "tags": ["plain", "text"],
            }
        });

        assert_eq!(strip_value(&mut response), 2);
        assert_eq!(response["post"]["title"], "Title");
        assert_eq!(response["post"]["cover"]["alt"], "A cat");
        assert_eq!(response["post"]["cover"]["width"], 640);
        assert_eq!(strip_value(&mut response), 0);
    }
}
