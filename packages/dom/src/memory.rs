//! # In-Memory Host
//!
//! A small arena-backed DOM that implements [`Dom`] faithfully enough for the
//! engine: nodes keep their identity when detached, freed slots bump their
//! generation, and every tree/attribute/character-data change is queued as a
//! [`MutationRecord`] for the subscriptions that cover it.

use crate::geometry::Rect;
use crate::host::{DispatchedEvent, Dom, ListenerId, ListenerKind};
use crate::mutation::{MutationRecord, ObserveOptions, SubscriptionId};
use crate::node::{NodeId, NodeKind};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rects: Vec<Rect>,
}

impl NodeData {
    fn new(kind: NodeKind, tag: &str, text: &str) -> Self {
        Self {
            kind,
            tag: tag.to_ascii_lowercase(),
            text: text.to_string(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            rects: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

#[derive(Debug)]
struct Subscription {
    root: NodeId,
    options: ObserveOptions,
    queue: Vec<MutationRecord>,
}

#[derive(Debug)]
pub struct MemoryDom {
    slots: Vec<Slot>,
    free: Vec<u32>,
    document: NodeId,
    body: NodeId,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    next_subscription: u64,
    listeners: BTreeMap<ListenerId, ListenerKind>,
    next_listener: u64,
    events: Vec<DispatchedEvent>,
    opened: Vec<(String, bool)>,
    prompts: Vec<String>,
    confirm_answer: bool,
}

impl MemoryDom {
    /// Empty `#document > html > body` tree.
    pub fn new() -> Self {
        let mut dom = Self {
            slots: Vec::new(),
            free: Vec::new(),
            document: NodeId::new(0, 0),
            body: NodeId::new(0, 0),
            subscriptions: BTreeMap::new(),
            next_subscription: 0,
            listeners: BTreeMap::new(),
            next_listener: 0,
            events: Vec::new(),
            opened: Vec::new(),
            prompts: Vec::new(),
            confirm_answer: false,
        };

        dom.document = dom.alloc(NodeData::new(NodeKind::Document, "#document", ""));
        let html = dom.append_element(dom.document, "html");
        dom.body = dom.append_element(html, "body");
        dom
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            NodeId::new(index, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                data: Some(data),
            });
            NodeId::new((self.slots.len() - 1) as u32, 0)
        }
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    fn record(&mut self, record: MutationRecord) {
        let interested: Vec<SubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, sub)| self.wants(sub, &record))
            .map(|(id, _)| *id)
            .collect();

        for id in interested {
            if let Some(sub) = self.subscriptions.get_mut(&id) {
                sub.queue.push(record.clone());
            }
        }
    }

    fn wants(&self, sub: &Subscription, record: &MutationRecord) -> bool {
        let target = record.target();
        let in_scope = if sub.options.subtree {
            self.contains(sub.root, target)
        } else {
            sub.root == target
        };

        in_scope
            && match record {
                MutationRecord::ChildList { .. } => sub.options.child_list,
                MutationRecord::CharacterData { .. } => sub.options.character_data,
                MutationRecord::Attributes { name, .. } => sub.options.wants_attribute(name),
            }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
        });
    }

    /// Insert `child` under `parent`, before `reference` (or last).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        if self.contains(child, parent) {
            return;
        }

        self.detach(child);

        if let Some(p) = self.node_mut(parent) {
            let position = reference
                .and_then(|r| p.children.iter().position(|c| *c == r))
                .unwrap_or(p.children.len());
            p.children.insert(position, child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::new(NodeKind::Text, "#text", text))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::new(NodeKind::Comment, "#comment", text))
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.insert_before(parent, node, None);
        node
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.insert_before(parent, node, None);
        node
    }

    /// Replace the character data of a text or comment node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        if !matches!(data.kind, NodeKind::Text | NodeKind::Comment) {
            return;
        }
        data.text = text.to_string();
        self.record(MutationRecord::CharacterData { target: node });
    }

    /// Layout is not computed; tests place boxes by hand.
    pub fn set_rects(&mut self, node: NodeId, rects: Vec<Rect>) {
        if let Some(data) = self.node_mut(node) {
            data.rects = rects;
        }
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.set_rects(node, vec![rect]);
    }

    /// Detach `node` and release its whole subtree; stale handles stop resolving.
    pub fn free(&mut self, node: NodeId) {
        self.detach(node);

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(data) = slot.data.take() {
                stack.extend(data.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
        }
    }

    /// Pre-order walk of `root` and everything under it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let Some(data) = self.node(current) else {
                continue;
            };
            out.push(current);
            stack.extend(data.children.iter().rev().copied());
        }
        out
    }

    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.node(node)
            .map(|n| {
                n.attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.node(node).and_then(|n| n.styles.get(property).cloned())
    }

    /// Elements under `root` carrying attribute `name`.
    pub fn find_by_attribute(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.has_attribute(*n, name))
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn has_listener(&self, kind: ListenerKind) -> bool {
        self.listeners.values().any(|k| *k == kind)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DispatchedEvent> + 'a {
        self.events.iter().filter(move |e| e.name == name)
    }

    pub fn opened_urls(&self) -> &[(String, bool)] {
        &self.opened
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn set_confirm_answer(&mut self, answer: bool) {
        self.confirm_answer = answer;
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for MemoryDom {
    fn document(&self) -> NodeId {
        self.document
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body).filter(|b| self.node(*b).is_some())
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|n| n.kind)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.node(node).is_some() && self.contains(self.document, node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.node(node)
            .filter(|n| n.kind == NodeKind::Element)
            .map(|n| n.tag.clone())
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.node(node)
            .filter(|n| n.kind == NodeKind::Text)
            .map(|n| n.text.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).and_then(|n| n.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        if data.kind != NodeKind::Element {
            return;
        }
        data.attributes.insert(name.to_string(), value.to_string());
        self.record(MutationRecord::Attributes {
            target: node,
            name: name.to_string(),
        });
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let removed = self
            .node_mut(node)
            .and_then(|n| n.attributes.remove(name))
            .is_some();
        if removed {
            self.record(MutationRecord::Attributes {
                target: node,
                name: name.to_string(),
            });
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: Option<&str>) {
        if let Some(data) = self.node_mut(node) {
            match value {
                Some(v) => {
                    data.styles.insert(property.to_string(), v.to_string());
                }
                None => {
                    data.styles.remove(property);
                }
            }
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::new(NodeKind::Element, tag, ""))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn client_rects(&self, node: NodeId) -> Vec<Rect> {
        let Some(data) = self.node(node) else {
            return Vec::new();
        };
        if !data.rects.is_empty() {
            return data.rects.clone();
        }
        data.children
            .iter()
            .flat_map(|c| self.client_rects(*c))
            .collect()
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.client_rects(node)
            .into_iter()
            .reduce(|acc, r| acc.union(&r))
    }

    fn observe(&mut self, root: NodeId, options: ObserveOptions) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions.insert(
            id,
            Subscription {
                root,
                options,
                queue: Vec::new(),
            },
        );
        id
    }

    fn take_records(&mut self, subscription: SubscriptionId) -> Vec<MutationRecord> {
        self.subscriptions
            .get_mut(&subscription)
            .map(|sub| std::mem::take(&mut sub.queue))
            .unwrap_or_default()
    }

    fn disconnect(&mut self, subscription: SubscriptionId) {
        self.subscriptions.remove(&subscription);
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn dispatch_custom_event(&mut self, target: NodeId, name: &str, detail: &Value) {
        self.events.push(DispatchedEvent {
            target,
            name: name.to_string(),
            detail: detail.clone(),
        });
    }

    fn open_url(&mut self, url: &str, new_tab: bool) {
        self.opened.push((url.to_string(), new_tab));
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.prompts.push(message.to_string());
        self.confirm_answer
    }
}
