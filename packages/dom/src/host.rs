//! # Host Contract
//!
//! Traits the engine is generic over. A browser binding implements them on
//! top of the real DOM; [`crate::MemoryDom`] implements them in memory.

use crate::geometry::Rect;
use crate::mutation::{MutationRecord, ObserveOptions, SubscriptionId};
use crate::node::{NodeId, NodeKind};
use crate::scheduler::FrameId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page-level events the engine listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListenerKind {
    PointerOver,
    PointerOut,
    FocusIn,
    FocusOut,
    Click,
    KeyDown,
    Scroll,
    Resize,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 8] = [
        ListenerKind::PointerOver,
        ListenerKind::PointerOut,
        ListenerKind::FocusIn,
        ListenerKind::FocusOut,
        ListenerKind::Click,
        ListenerKind::KeyDown,
        ListenerKind::Scroll,
        ListenerKind::Resize,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// A custom event the engine dispatched through the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub name: String,
    pub detail: Value,
}

/// Tree access, writes and side effects the engine needs from the page.
///
/// Queries on a node the host no longer knows return `None`/empty, and
/// writes to such a node are ignored. Nothing here panics on stale handles.
pub trait Dom {
    fn document(&self) -> NodeId;

    fn body(&self) -> Option<NodeId>;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Whether `node` is still reachable from the document.
    fn is_connected(&self, node: NodeId) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Lowercase tag name, elements only.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Character data of a text node.
    fn text(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Set (`Some`) or clear (`None`) an inline style property.
    fn set_style(&mut self, node: NodeId, property: &str, value: Option<&str>);

    fn create_element(&mut self, tag: &str) -> NodeId;

    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Detach `node` from its parent.
    fn remove(&mut self, node: NodeId);

    /// Per-line boxes for inline content, one box for block content.
    fn client_rects(&self, node: NodeId) -> Vec<Rect>;

    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    fn observe(&mut self, root: NodeId, options: ObserveOptions) -> SubscriptionId;

    /// Drain records queued for `subscription` since the last call.
    fn take_records(&mut self, subscription: SubscriptionId) -> Vec<MutationRecord>;

    fn disconnect(&mut self, subscription: SubscriptionId);

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;

    fn remove_listener(&mut self, listener: ListenerId);

    fn dispatch_custom_event(&mut self, target: NodeId, name: &str, detail: &Value);

    fn open_url(&mut self, url: &str, new_tab: bool);

    /// Ask the user a yes/no question.
    fn confirm(&mut self, message: &str) -> bool;

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Nearest element at or above `node`.
    fn element_of(&self, node: NodeId) -> Option<NodeId> {
        if self.is_element(node) {
            Some(node)
        } else {
            self.parent(node).filter(|p| self.is_element(*p))
        }
    }

    /// Inclusive ancestor check.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }
}

/// Deferred-work primitives of the host event loop.
///
/// The engine keeps its own bookkeeping of what is pending; the host only
/// has to call back into the controller when the microtask or frame runs.
pub trait Scheduler {
    fn queue_microtask(&mut self);

    fn request_animation_frame(&mut self) -> FrameId;

    fn cancel_animation_frame(&mut self, frame: FrameId);
}
