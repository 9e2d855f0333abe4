//! Author-written edit tags.
//!
//! ```html
//! <div data-datocms-item-id="123" data-datocms-field-path="hero.title">...</div>
//! <div data-datocms-edit-info='{"itemId":"123","itemTypeId":"post"}'>...</div>
//! <a data-datocms-edit-url="https://acme.admin.datocms.com/editor/items/123/edit">...</a>
//! ```
//!
//! Individual attributes win over the JSON attribute; an edit URL on the CMS
//! domain fills whatever is still missing.

use crate::attributes::{self, EXPLICIT};
use crate::codec::{derive_from_href, fields_from_object};
use crate::field_path::normalize_field_path_str;
use crate::info::{DecodedInfo, InfoFields};
use crate::stamper::is_generated;
use content_link_dom::{Dom, NodeId};
use serde_json::{Map, Value};

/// Every present explicit attribute as `name:value`, in a fixed order.
///
/// `None` when the element has no explicit tags or is one of ours.
pub fn explicit_signature<D: Dom + ?Sized>(dom: &D, element: NodeId) -> Option<String> {
    if is_generated(dom, element) {
        return None;
    }

    let parts: Vec<String> = EXPLICIT
        .iter()
        .filter_map(|name| {
            dom.attribute(element, name)
                .map(|value| format!("{}:{}", name, value))
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\u{1f}"))
    }
}

/// Read explicit tags into edit metadata.
pub fn read_explicit<D: Dom + ?Sized>(dom: &D, element: NodeId) -> Option<DecodedInfo> {
    let mut raw = Map::new();
    let mut fields = InfoFields::default();

    if let Some(json) = dom.attribute(element, attributes::EDIT_INFO) {
        match serde_json::from_str::<Value>(&json) {
            Ok(Value::Object(object)) => {
                fields = fields_from_object(&object);
                raw.insert(attributes::EDIT_INFO.to_string(), Value::Object(object));
            }
            _ => {
                tracing::debug!(element = %element, "Ignoring malformed edit-info attribute");
            }
        }
    }

    let attr = |name: &str| dom.attribute(element, name);
    fields.override_with(InfoFields {
        item_id: attr(attributes::ITEM_ID),
        item_type_id: attr(attributes::ITEM_TYPE_ID),
        field_path: attr(attributes::FIELD_PATH)
            .as_deref()
            .and_then(normalize_field_path_str),
        locale: attr(attributes::LOCALE),
        environment: attr(attributes::ENVIRONMENT),
        edit_url: attr(attributes::EDIT_URL),
    });

    if let Some(derived) = fields.edit_url.as_deref().and_then(derive_from_href) {
        fields.fill_missing(derived);
    }

    for name in EXPLICIT.iter().filter(|n| **n != attributes::EDIT_INFO) {
        if let Some(value) = attr(*name) {
            raw.insert(name.to_string(), Value::String(value));
        }
    }

    DecodedInfo::new(fields, Value::Object(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_link_dom::MemoryDom;

    #[test]
    fn test_attributes_override_json() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let div = dom.append_element(body, "div");
        dom.set_attribute(
            div,
            attributes::EDIT_INFO,
            r#"{"itemId":"1","itemTypeId":"post","fieldPath":["hero","title"]}"#,
        );
        dom.set_attribute(div, attributes::ITEM_ID, "2");

        let info = read_explicit(&dom, div).unwrap();
        assert_eq!(info.item_id.as_deref(), Some("2"));
        assert_eq!(info.item_type_id.as_deref(), Some("post"));
        assert_eq!(info.field_path.as_deref(), Some("hero.title"));
    }

    #[test]
    fn test_signature_changes_with_field_path() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let div = dom.append_element(body, "div");
        assert_eq!(explicit_signature(&dom, div), None);

        dom.set_attribute(div, attributes::ITEM_ID, "1");
        let before = explicit_signature(&dom, div).unwrap();
        dom.set_attribute(div, attributes::FIELD_PATH, "title");
        let after = explicit_signature(&dom, div).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_malformed_json_without_attributes_is_none() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let div = dom.append_element(body, "div");
        dom.set_attribute(div, attributes::EDIT_INFO, "{not json");

        assert!(explicit_signature(&dom, div).is_some());
        assert!(read_explicit(&dom, div).is_none());
    }

    #[test]
    fn test_generated_elements_are_not_explicit() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let p = dom.append_element(body, "p");
        dom.set_attribute(p, attributes::EDIT_URL, "https://acme.admin.datocms.com/x");
        dom.set_attribute(p, attributes::GENERATED, attributes::GENERATED_VALUE);

        assert_eq!(explicit_signature(&dom, p), None);
    }
}
