//! # Interactive-Target Resolver
//!
//! Maps a pointer, focus or key event target to the edit target it belongs
//! to, and decides who gets the click: the page or the editor.
//!
//! ## Policy
//!
//! ```text
//! event target ──► nearest edit target (ancestor-or-self, inside root)
//!        │                     │
//!        └──── chain ──────────┘   any natively interactive element?
//!                                  any click-conflict override?
//! ```
//!
//! Without an override, a natively interactive element on the chain keeps
//! its behavior (`prefer-page`); otherwise the editor opens (`prefer-dato`).

use crate::attributes;
use crate::deep_link::build_deep_link;
use crate::observer::Observer;
use crate::tree;
use content_link_dom::{Dom, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do when an edit target is also natively interactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickConflict {
    Prompt,
    PreferPage,
    PreferDato,
    Ignore,
}

impl ClickConflict {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prompt" => Some(ClickConflict::Prompt),
            "prefer-page" => Some(ClickConflict::PreferPage),
            "prefer-dato" => Some(ClickConflict::PreferDato),
            "ignore" => Some(ClickConflict::Ignore),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClickConflict::Prompt => "prompt",
            ClickConflict::PreferPage => "prefer-page",
            ClickConflict::PreferDato => "prefer-dato",
            ClickConflict::Ignore => "ignore",
        }
    }
}

/// An element with resolved edit metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub element: NodeId,
    pub edit_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: Target,
    /// A natively interactive element sits between the event target and the edit target
    pub interactive: bool,
    /// Nearest override on that chain
    pub conflict: Option<ClickConflict>,
}

impl Resolution {
    pub fn policy(&self) -> ClickConflict {
        self.conflict.unwrap_or(if self.interactive {
            ClickConflict::PreferPage
        } else {
            ClickConflict::PreferDato
        })
    }

    pub fn highlights(&self) -> bool {
        self.policy() != ClickConflict::Ignore
    }
}

const FORM_CONTROLS: [&str; 4] = ["input", "select", "textarea", "option"];

/// Whether the browser already gives `element` click or keyboard behavior.
pub fn is_native_interactive<D: Dom + ?Sized>(dom: &D, element: NodeId) -> bool {
    let Some(tag) = dom.tag_name(element) else {
        return false;
    };

    match tag.as_str() {
        "a" | "area" if dom.has_attribute(element, "href") => return true,
        "button" | "summary" => return true,
        "input" => {
            return dom.attribute(element, "type").as_deref() != Some("hidden");
        }
        t if FORM_CONTROLS.contains(&t) => return true,
        _ => {}
    }

    if let Some(editable) = dom.attribute(element, "contenteditable") {
        if !editable.eq_ignore_ascii_case("false") {
            return true;
        }
    }

    dom.attribute(element, "role").as_deref() == Some("button")
        && dom
            .attribute(element, "tabindex")
            .and_then(|t| t.trim().parse::<i32>().ok())
            .map_or(false, |t| t >= 0)
}

/// Override declared directly on `element`, if any.
pub fn conflict_override<D: Dom + ?Sized>(dom: &D, element: NodeId) -> Option<ClickConflict> {
    if let Some(conflict) = dom
        .attribute(element, attributes::CLICK_CONFLICT)
        .as_deref()
        .and_then(ClickConflict::parse)
    {
        return Some(conflict);
    }
    match dom.attribute(element, attributes::ALLOW_FOLLOW) {
        Some(value) if !value.eq_ignore_ascii_case("false") => Some(ClickConflict::PreferPage),
        _ => None,
    }
}

/// Resolves event targets against one root and one editor base URL.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: NodeId,
    base_editing_url: String,
    environment: Option<String>,
}

impl Resolver {
    pub fn new(root: NodeId, base_editing_url: &str, environment: Option<&str>) -> Self {
        Self {
            root,
            base_editing_url: base_editing_url.to_string(),
            environment: environment.map(str::to_string),
        }
    }

    /// Whether `element` carries edit metadata.
    pub fn is_edit_target<D: Dom + ?Sized>(&self, dom: &D, observer: &Observer, element: NodeId) -> bool {
        dom.has_attribute(element, attributes::EDIT_URL)
            || dom.has_attribute(element, attributes::EDITABLE)
            || observer.explicit_info(element).is_some()
    }

    /// Nearest edit target at or above `node`, without leaving the root.
    pub fn edit_target<D: Dom + ?Sized>(&self, dom: &D, observer: &Observer, node: NodeId) -> Option<NodeId> {
        if !dom.contains(self.root, node) || tree::inside_ignored(dom, node) {
            return None;
        }
        let mut current = dom.element_of(node);
        while let Some(element) = current {
            if self.is_edit_target(dom, observer, element) {
                return Some(element);
            }
            if element == self.root {
                return None;
            }
            current = dom.parent(element).filter(|p| dom.is_element(*p));
        }
        None
    }

    /// Editor link for an edit target.
    ///
    /// A written edit-url attribute is used as is; explicit targets without
    /// one get a link built from their cached metadata.
    pub fn edit_url<D: Dom + ?Sized>(&self, dom: &D, observer: &Observer, element: NodeId) -> Option<String> {
        if let Some(url) = dom.attribute(element, attributes::EDIT_URL) {
            if !url.trim().is_empty() {
                return Some(url);
            }
        }
        let info = observer.explicit_info(element)?;
        match build_deep_link(info, &self.base_editing_url, self.environment.as_deref()) {
            Ok(url) => Some(url),
            Err(err) => {
                debug!(element = %element, error = %err, "No editor link for explicit target");
                None
            }
        }
    }

    pub fn resolve<D: Dom + ?Sized>(&self, dom: &D, observer: &Observer, node: NodeId) -> Option<Resolution> {
        let element = self.edit_target(dom, observer, node)?;
        let edit_url = self.edit_url(dom, observer, element)?;

        let mut interactive = false;
        let mut conflict = None;
        let mut current = dom.element_of(node);
        while let Some(link) = current {
            interactive |= is_native_interactive(dom, link);
            if conflict.is_none() {
                conflict = conflict_override(dom, link);
            }
            if link == element {
                break;
            }
            current = dom.parent(link);
        }

        Some(Resolution {
            target: Target { element, edit_url },
            interactive,
            conflict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ObserverOptions;
    use content_link_dom::MemoryDom;

    const URL: &str = "https://acme.admin.datocms.com/editor/items/1/edit";

    fn setup() -> (MemoryDom, NodeId, Observer, Resolver) {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let observer = Observer::new(body, ObserverOptions::default());
        let resolver = Resolver::new(body, "https://acme.admin.datocms.com", None);
        (dom, body, observer, resolver)
    }

    #[test]
    fn test_span_inside_link_counts_as_interactive() {
        let (mut dom, body, observer, resolver) = setup();
        let article = dom.append_element(body, "article");
        dom.set_attribute(article, attributes::EDIT_URL, URL);
        let link = dom.append_element(article, "a");
        dom.set_attribute(link, "href", "/post");
        let span = dom.append_element(link, "span");

        let resolution = resolver.resolve(&dom, &observer, span).unwrap();
        assert_eq!(resolution.target.element, article);
        assert!(resolution.interactive);
        assert_eq!(resolution.policy(), ClickConflict::PreferPage);
    }

    #[test]
    fn test_override_wins_over_native() {
        let (mut dom, body, observer, resolver) = setup();
        let button = dom.append_element(body, "button");
        dom.set_attribute(button, attributes::EDIT_URL, URL);
        dom.set_attribute(button, attributes::CLICK_CONFLICT, "prefer-dato");

        let resolution = resolver.resolve(&dom, &observer, button).unwrap();
        assert!(resolution.interactive);
        assert_eq!(resolution.policy(), ClickConflict::PreferDato);
    }

    #[test]
    fn test_allow_follow_means_prefer_page() {
        let (mut dom, body, observer, resolver) = setup();
        let p = dom.append_element(body, "p");
        dom.set_attribute(p, attributes::EDIT_URL, URL);
        dom.set_attribute(p, attributes::ALLOW_FOLLOW, "");

        let resolution = resolver.resolve(&dom, &observer, p).unwrap();
        assert!(!resolution.interactive);
        assert_eq!(resolution.policy(), ClickConflict::PreferPage);
    }

    #[test]
    fn test_role_button_needs_tabindex() {
        let (mut dom, body, _, _) = setup();
        let div = dom.append_element(body, "div");
        dom.set_attribute(div, "role", "button");
        assert!(!is_native_interactive(&dom, div));
        dom.set_attribute(div, "tabindex", "-1");
        assert!(!is_native_interactive(&dom, div));
        dom.set_attribute(div, "tabindex", "0");
        assert!(is_native_interactive(&dom, div));
    }

    #[test]
    fn test_contenteditable_false_is_not_interactive() {
        let (mut dom, body, _, _) = setup();
        let div = dom.append_element(body, "div");
        dom.set_attribute(div, "contenteditable", "false");
        assert!(!is_native_interactive(&dom, div));
        dom.set_attribute(div, "contenteditable", "");
        assert!(is_native_interactive(&dom, div));
    }

    #[test]
    fn test_explicit_target_gets_built_link() {
        let (mut dom, body, mut observer, resolver) = setup();
        let div = dom.append_element(body, "div");
        dom.set_attribute(div, attributes::ITEM_ID, "42");
        dom.set_attribute(div, attributes::ITEM_TYPE_ID, "post");
        let inner = dom.append_element(div, "em");
        observer.scan(&dom, body);

        let resolution = resolver.resolve(&dom, &observer, inner).unwrap();
        assert_eq!(resolution.target.element, div);
        assert_eq!(
            resolution.target.edit_url,
            "https://acme.admin.datocms.com/editor/item_types/post/items/42/edit"
        );
    }

    #[test]
    fn test_nothing_outside_root() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let root = dom.append_element(body, "main");
        let outside = dom.append_element(body, "p");
        dom.set_attribute(outside, attributes::EDIT_URL, URL);

        let observer = Observer::new(root, ObserverOptions::default());
        let resolver = Resolver::new(root, "https://acme.admin.datocms.com", None);
        assert!(resolver.resolve(&dom, &observer, outside).is_none());
    }
}
