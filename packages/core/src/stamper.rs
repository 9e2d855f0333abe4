//! # Attribute Stamper
//!
//! Writes and erases the `data-datocms-*` vocabulary on page elements.
//!
//! Writes are minimal: an attribute is only touched when its value differs,
//! so re-stamping an already-correct element produces no DOM mutations at
//! all. Author-written tags are never overwritten; only elements carrying
//! the generated flag are ours to change.

use crate::attributes::{self, DEBUG_SET, EXPLICIT, GENERATED_SET};
use crate::info::EditInfo;
use crate::tree;
use content_link_dom::{Dom, NodeId};

pub fn is_generated<D: Dom + ?Sized>(dom: &D, element: NodeId) -> bool {
    dom.attribute(element, attributes::GENERATED).as_deref() == Some(attributes::GENERATED_VALUE)
}

/// Whether an author tagged `element` by hand.
pub fn is_explicit<D: Dom + ?Sized>(dom: &D, element: NodeId) -> bool {
    !is_generated(dom, element) && EXPLICIT.iter().any(|name| dom.has_attribute(element, name))
}

/// Stamp generated edit metadata onto `element`.
///
/// Returns whether any attribute changed. Elements with author-written tags
/// are left alone and report `false`.
pub fn stamp<D: Dom + ?Sized>(dom: &mut D, element: NodeId, edit: &EditInfo) -> bool {
    if !dom.is_element(element) || is_explicit(dom, element) {
        return false;
    }

    let mut changed = false;
    changed |= write(dom, element, attributes::EDIT_URL, Some(&edit.edit_url));
    changed |= write(dom, element, attributes::ITEM_ID, edit.item_id.as_deref());
    changed |= write(dom, element, attributes::ITEM_TYPE_ID, edit.item_type_id.as_deref());
    changed |= write(dom, element, attributes::ENVIRONMENT, edit.environment.as_deref());
    changed |= write(dom, element, attributes::LOCALE, edit.locale.as_deref());
    changed |= write(dom, element, attributes::GENERATED, Some(attributes::GENERATED_VALUE));
    changed |= write(dom, element, attributes::EDITABLE, Some(""));
    changed
}

/// Debug attributes explaining why an element is editable.
pub fn stamp_debug<D: Dom + ?Sized>(
    dom: &mut D,
    element: NodeId,
    reason: &str,
    url: Option<&str>,
    info_json: Option<&str>,
) -> bool {
    let mut changed = false;
    changed |= write(dom, element, attributes::DEBUG_REASON, Some(reason));
    changed |= write(dom, element, attributes::DEBUG_URL, url);
    changed |= write(dom, element, attributes::DEBUG_INFO, info_json);
    changed
}

/// Flag an explicit target as editable without touching its metadata.
pub fn mark_editable<D: Dom + ?Sized>(dom: &mut D, element: NodeId) -> bool {
    write(dom, element, attributes::EDITABLE, Some(""))
}

/// Remove everything the engine wrote on one element.
pub fn unstamp<D: Dom + ?Sized>(dom: &mut D, element: NodeId) -> bool {
    let mut changed = false;
    if is_generated(dom, element) {
        for name in GENERATED_SET {
            changed |= write(dom, element, name, None);
        }
    } else {
        changed |= write(dom, element, attributes::EDITABLE, None);
    }
    for name in DEBUG_SET {
        changed |= write(dom, element, name, None);
    }
    changed
}

/// Erase generated metadata, editable markers and debug attributes under `root`.
///
/// Returns the number of elements that changed.
pub fn clear<D: Dom + ?Sized>(dom: &mut D, root: NodeId) -> usize {
    let mut cleared = 0;
    for node in tree::descendants(dom, root) {
        if dom.is_element(node) && unstamp(dom, node) {
            cleared += 1;
        }
    }
    cleared
}

fn write<D: Dom + ?Sized>(dom: &mut D, element: NodeId, name: &str, value: Option<&str>) -> bool {
    let current = dom.attribute(element, name);
    match value {
        Some(v) if current.as_deref() == Some(v) => false,
        Some(v) => {
            dom.set_attribute(element, name, v);
            true
        }
        None if current.is_some() => {
            dom.remove_attribute(element, name);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_link_dom::MemoryDom;

    fn edit_info() -> EditInfo {
        EditInfo {
            edit_url: "https://acme.admin.datocms.com/editor/items/1/edit".to_string(),
            item_id: Some("1".to_string()),
            item_type_id: Some("post".to_string()),
            environment: None,
            locale: Some("en".to_string()),
        }
    }

    #[test]
    fn test_stamp_is_idempotent() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let p = dom.append_element(body, "p");

        assert!(stamp(&mut dom, p, &edit_info()));
        assert!(!stamp(&mut dom, p, &edit_info()));

        assert_eq!(
            dom.attribute(p, attributes::GENERATED).as_deref(),
            Some("stega")
        );
        assert_eq!(dom.attribute(p, attributes::LOCALE).as_deref(), Some("en"));
        assert!(dom.has_attribute(p, attributes::EDITABLE));
        assert!(!dom.has_attribute(p, attributes::ENVIRONMENT));
    }

    #[test]
    fn test_stamp_updates_and_drops_stale_fields() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let p = dom.append_element(body, "p");
        stamp(&mut dom, p, &edit_info());

        let mut updated = edit_info();
        updated.locale = None;
        assert!(stamp(&mut dom, p, &updated));
        assert!(!dom.has_attribute(p, attributes::LOCALE));
    }

    #[test]
    fn test_never_clobbers_explicit_tags() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let p = dom.append_element(body, "p");
        dom.set_attribute(p, attributes::EDIT_URL, "https://author.example.com/x");

        assert!(!stamp(&mut dom, p, &edit_info()));
        assert_eq!(
            dom.attribute(p, attributes::EDIT_URL).as_deref(),
            Some("https://author.example.com/x")
        );
        assert!(!dom.has_attribute(p, attributes::GENERATED));
    }

    #[test]
    fn test_clear_removes_generated_and_markers_only() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let generated = dom.append_element(body, "p");
        let explicit = dom.append_element(body, "div");
        dom.set_attribute(explicit, attributes::ITEM_ID, "42");

        stamp(&mut dom, generated, &edit_info());
        stamp_debug(&mut dom, generated, "stega-text", Some("u"), Some("{}"));
        mark_editable(&mut dom, explicit);

        assert_eq!(clear(&mut dom, body), 2);
        assert!(dom.attributes(generated).is_empty());
        assert_eq!(
            dom.attributes(explicit),
            vec![(attributes::ITEM_ID.to_string(), "42".to_string())]
        );
    }
}
