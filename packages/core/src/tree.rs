use crate::attributes;
use content_link_dom::{Dom, MutationRecord, NodeId, NodeKind};

/// Elements whose contents are never page text.
const OPAQUE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Pre-order walk of `root` and everything under it.
pub(crate) fn descendants<D: Dom + ?Sized>(dom: &D, root: NodeId) -> Vec<NodeId> {
    walk(dom, root, |_| true)
}

/// Pre-order walk that does not descend into elements rejected by `enter`.
pub(crate) fn walk<D, F>(dom: &D, root: NodeId, mut enter: F) -> Vec<NodeId>
where
    D: Dom + ?Sized,
    F: FnMut(NodeId) -> bool,
{
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if dom.kind(node).is_none() {
            continue;
        }
        out.push(node);
        if enter(node) {
            let children = dom.children(node);
            stack.extend(children.into_iter().rev());
        }
    }
    out
}

pub(crate) fn is_overlay<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.has_attribute(node, attributes::OVERLAY)
}

pub(crate) fn is_opaque<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.tag_name(node)
        .map_or(false, |tag| OPAQUE_TAGS.contains(&tag.as_str()))
}

/// Nodes a scan should look at: skips the overlay layer and opaque elements.
pub(crate) fn scannable<D: Dom + ?Sized>(dom: &D, root: NodeId) -> Vec<NodeId> {
    if inside_ignored(dom, root) {
        return Vec::new();
    }
    walk(dom, root, |node| {
        dom.kind(node) != Some(NodeKind::Element)
            || !(is_overlay(dom, node) || is_opaque(dom, node))
    })
    .into_iter()
    .filter(|node| !(is_overlay(dom, *node) || is_opaque(dom, *node)))
    .collect()
}

/// Whether `node` sits inside the overlay layer or an opaque element.
pub(crate) fn inside_ignored<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if dom.is_element(n) && (is_overlay(dom, n) || is_opaque(dom, n)) {
            return true;
        }
        current = dom.parent(n);
    }
    false
}

/// Whether a record only touches the overlay layer or opaque elements.
pub(crate) fn is_ignored_record<D: Dom + ?Sized>(dom: &D, record: &MutationRecord) -> bool {
    if inside_ignored(dom, record.target()) {
        return true;
    }
    match record {
        MutationRecord::ChildList { added, removed, .. } => {
            let mut changed = added.iter().chain(removed).peekable();
            changed.peek().is_some() && changed.all(|node| inside_ignored(dom, *node))
        }
        MutationRecord::CharacterData { .. } | MutationRecord::Attributes { .. } => false,
    }
}
