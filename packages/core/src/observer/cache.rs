//! Signature-keyed node caches.
//!
//! Each cache is an arena keyed by [`NodeId`]. The id carries the host's
//! slot generation, so an entry can never be read back for a different node
//! that happens to reuse the slot; liveness is checked against the host on
//! query and by explicit sweeps, never by finalization.

use crate::info::DecodedInfo;
use content_link_dom::{Dom, NodeId};
use std::collections::HashMap;

/// Cached decode result for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub info: DecodedInfo,
    /// Raw value last inspected
    pub signature: String,
    /// Visible value at the time of the last successful decode
    pub cleaned: String,
}

/// Outcome of re-evaluating a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Decoded fresh metadata
    Matched,
    /// Marker gone but visible value unchanged; previous metadata kept
    Persisted,
    /// Signature identical to the cached one; nothing decoded
    Unchanged,
    /// Previously matched, no longer does
    Cleared,
    /// Never matched, still does not
    Unmatched,
}

#[derive(Debug, Default)]
pub struct NodeCache {
    entries: HashMap<NodeId, CacheEntry>,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&CacheEntry> {
        self.entries.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut CacheEntry> {
        self.entries.get_mut(&node)
    }

    pub fn insert(&mut self, node: NodeId, entry: CacheEntry) {
        self.entries.insert(node, entry);
    }

    pub fn remove(&mut self, node: NodeId) -> Option<CacheEntry> {
        self.entries.remove(&node)
    }

    /// Whether the cached signature for `node` is exactly `signature`.
    pub fn is_fresh(&self, node: NodeId, signature: &str) -> bool {
        self.entries
            .get(&node)
            .map_or(false, |entry| entry.signature == signature)
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.entries.keys().copied().collect();
        nodes.sort();
        nodes
    }

    /// Drop entries whose node is no longer in the document.
    pub fn evict_disconnected<D: Dom + ?Sized>(&mut self, dom: &D) -> usize {
        let before = self.entries.len();
        self.entries.retain(|node, _| dom.is_connected(*node));
        before - self.entries.len()
    }

    /// Drop every entry inside `root` (inclusive).
    pub fn purge_within<D: Dom + ?Sized>(&mut self, dom: &D, root: NodeId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|node, _| dom.kind(*node).is_some() && !dom.contains(root, *node));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
