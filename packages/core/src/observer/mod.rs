//! # Mutation-Tracking Observer
//!
//! Keeps a live index of editable content without re-walking the page on
//! every change.
//!
//! ## Caches
//!
//! | Cache      | Keyed node      | Signature                               |
//! |------------|-----------------|-----------------------------------------|
//! | `text`     | text node       | character data                          |
//! | `images`   | `img` element   | `alt` attribute                         |
//! | `explicit` | tagged element  | every explicit `name:value`, in order   |
//!
//! ## Re-evaluating a node
//!
//! 1. Compute the signature from the node's current raw value.
//! 2. Same as cached → done, no decode.
//! 3. Otherwise decode; on success cache `{info, signature, cleaned}`.
//! 4. On failure, with persist-after-clean on: if the visible value still
//!    equals the cached `cleaned`, keep the old metadata under the new
//!    signature. Frameworks that strip markers after hydration leave the
//!    text untouched, and the element should stay editable.
//! 5. Otherwise drop the entry.
//!
//! After the initial walk only the nodes named by mutation records are
//! re-evaluated, unless a subtree refresh is requested explicitly.

mod batch;
mod cache;
mod explicit;

pub use batch::{BatchPlan, MutationBatch};
pub use cache::{CacheEntry, Evaluation, NodeCache};
pub use explicit::{explicit_signature, read_explicit};

use crate::attributes;
use crate::codec;
use crate::info::DecodedInfo;
use crate::tree;
use content_link_dom::{Dom, MutationRecord, NodeId, NodeKind, ObserveOptions, SubscriptionId};
use content_link_stega as stega;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverOptions {
    pub persist_after_clean: bool,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            persist_after_clean: true,
        }
    }
}

/// Where a match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchSource {
    Text,
    ImageAlt,
    Explicit,
}

impl MatchSource {
    /// Value of the debug-reason attribute.
    pub fn reason(self) -> &'static str {
        match self {
            MatchSource::Text => "stega-text",
            MatchSource::ImageAlt => "stega-alt",
            MatchSource::Explicit => "explicit",
        }
    }
}

/// A cached, still-connected match.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The tracked node (text node, `img` or tagged element)
    pub node: NodeId,
    /// Element that becomes the edit target
    pub element: NodeId,
    pub source: MatchSource,
    pub info: DecodedInfo,
    pub cleaned: String,
}

/// Counts from one scan or batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub visited: usize,
    pub matched: usize,
    pub persisted: usize,
    pub unchanged: usize,
    pub cleared: usize,
    pub purged: usize,
}

impl ScanReport {
    fn record(&mut self, evaluation: Evaluation) {
        match evaluation {
            Evaluation::Matched => self.matched += 1,
            Evaluation::Persisted => self.persisted += 1,
            Evaluation::Unchanged => self.unchanged += 1,
            Evaluation::Cleared => self.cleared += 1,
            Evaluation::Unmatched => {}
        }
    }

    fn merge(&mut self, other: ScanReport) {
        self.visited += other.visited;
        self.matched += other.matched;
        self.persisted += other.persisted;
        self.unchanged += other.unchanged;
        self.cleared += other.cleared;
        self.purged += other.purged;
    }
}

/// Lifetime counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverStats {
    pub decode_calls: u64,
    pub memo_hits: u64,
    pub evictions: u64,
}

pub struct Observer {
    root: NodeId,
    options: ObserverOptions,
    text: NodeCache,
    images: NodeCache,
    explicit: NodeCache,
    subscription: Option<SubscriptionId>,
    stats: ObserverStats,
}

impl Observer {
    pub fn new(root: NodeId, options: ObserverOptions) -> Self {
        Self {
            root,
            options,
            text: NodeCache::new(),
            images: NodeCache::new(),
            explicit: NodeCache::new(),
            subscription: None,
            stats: ObserverStats::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> ObserverOptions {
        self.options
    }

    pub fn stats(&self) -> ObserverStats {
        self.stats
    }

    /// Subscribe to child-list, character-data and the observed attributes under the root.
    pub fn connect<D: Dom + ?Sized>(&mut self, dom: &mut D) {
        if self.subscription.is_some() {
            return;
        }
        let options = ObserveOptions {
            child_list: true,
            character_data: true,
            attributes: true,
            attribute_filter: Some(attributes::observed()),
            subtree: true,
        };
        self.subscription = Some(dom.observe(self.root, options));
        debug!(root = %self.root, "Observer connected");
    }

    /// Drop the subscription; records still queued are discarded with it.
    pub fn disconnect<D: Dom + ?Sized>(&mut self, dom: &mut D) {
        if let Some(subscription) = self.subscription.take() {
            dom.disconnect(subscription);
            debug!(root = %self.root, "Observer disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn take_records<D: Dom + ?Sized>(&mut self, dom: &mut D) -> Vec<MutationRecord> {
        match self.subscription {
            Some(subscription) => dom.take_records(subscription),
            None => Vec::new(),
        }
    }

    /// Re-evaluate every node under `root`. Memoized: unchanged nodes cost no decode.
    #[instrument(skip_all, fields(root = %root))]
    pub fn scan<D: Dom + ?Sized>(&mut self, dom: &D, root: NodeId) -> ScanReport {
        let mut report = ScanReport::default();
        for node in tree::scannable(dom, root) {
            report.merge(self.evaluate_node(dom, node));
        }
        debug!(
            visited = report.visited,
            matched = report.matched,
            unchanged = report.unchanged,
            cleared = report.cleared,
            "Scan complete"
        );
        report
    }

    /// Apply one coalesced batch of mutations.
    pub fn process_batch<D: Dom + ?Sized>(&mut self, dom: &D, batch: &MutationBatch) -> ScanReport {
        let plan = batch.plan(dom);
        let mut report = ScanReport::default();

        for removed in &plan.purged {
            report.purged += self.purge_subtree(dom, *removed);
        }
        for root in &plan.rescan {
            report.merge(self.scan(dom, *root));
        }
        for node in &plan.singles {
            if !tree::inside_ignored(dom, *node) {
                report.merge(self.evaluate_node(dom, *node));
            }
        }

        debug!(
            records = batch.record_count(),
            rescanned = plan.rescan.len(),
            singles = plan.singles.len(),
            purged = report.purged,
            "Mutation batch processed"
        );
        report
    }

    /// Steps 1-5 for every cache `node` belongs to.
    pub fn evaluate_node<D: Dom + ?Sized>(&mut self, dom: &D, node: NodeId) -> ScanReport {
        let mut report = ScanReport {
            visited: 1,
            ..Default::default()
        };

        match dom.kind(node) {
            Some(NodeKind::Text) => {
                let raw = dom.text(node).unwrap_or_default();
                report.record(self.evaluate_marker(CacheSlot::Text, node, &raw));
            }
            Some(NodeKind::Element) => {
                if dom.tag_name(node).as_deref() == Some("img") {
                    let evaluation = match dom.attribute(node, attributes::ALT) {
                        Some(alt) => self.evaluate_marker(CacheSlot::Images, node, &alt),
                        None => forget(&mut self.images, node),
                    };
                    report.record(evaluation);
                }
                report.record(self.evaluate_explicit(dom, node));
            }
            _ => {}
        }

        report
    }

    fn evaluate_marker(&mut self, slot: CacheSlot, node: NodeId, raw: &str) -> Evaluation {
        let persist = self.options.persist_after_clean;
        let cache = match slot {
            CacheSlot::Text => &mut self.text,
            CacheSlot::Images => &mut self.images,
        };

        if cache.is_fresh(node, raw) {
            self.stats.memo_hits += 1;
            return Evaluation::Unchanged;
        }

        let split = stega::split(raw);
        let decoded = if split.encoded.is_some() {
            self.stats.decode_calls += 1;
            codec::decode(raw, Some(&split))
        } else {
            None
        };

        if let Some(info) = decoded {
            cache.insert(
                node,
                CacheEntry {
                    info,
                    signature: raw.to_string(),
                    cleaned: split.cleaned,
                },
            );
            return Evaluation::Matched;
        }

        if persist {
            if let Some(entry) = cache.get_mut(node) {
                if entry.cleaned == split.cleaned {
                    entry.signature = raw.to_string();
                    return Evaluation::Persisted;
                }
            }
        }

        forget(cache, node)
    }

    fn evaluate_explicit<D: Dom + ?Sized>(&mut self, dom: &D, element: NodeId) -> Evaluation {
        let Some(signature) = explicit_signature(dom, element) else {
            return forget(&mut self.explicit, element);
        };

        if self.explicit.is_fresh(element, &signature) {
            self.stats.memo_hits += 1;
            return Evaluation::Unchanged;
        }

        self.stats.decode_calls += 1;
        match read_explicit(dom, element) {
            Some(info) => {
                self.explicit.insert(
                    element,
                    CacheEntry {
                        info,
                        signature,
                        cleaned: String::new(),
                    },
                );
                Evaluation::Matched
            }
            None => forget(&mut self.explicit, element),
        }
    }

    /// Forget every tracked node inside `root`.
    pub fn purge_subtree<D: Dom + ?Sized>(&mut self, dom: &D, root: NodeId) -> usize {
        let purged = self.text.purge_within(dom, root)
            + self.images.purge_within(dom, root)
            + self.explicit.purge_within(dom, root);
        self.stats.evictions += purged as u64;
        purged
    }

    /// Liveness sweep over all caches.
    pub fn sweep<D: Dom + ?Sized>(&mut self, dom: &D) -> usize {
        let evicted = self.text.evict_disconnected(dom)
            + self.images.evict_disconnected(dom)
            + self.explicit.evict_disconnected(dom);
        self.stats.evictions += evicted as u64;
        if evicted > 0 {
            debug!(evicted, "Swept detached nodes");
        }
        evicted
    }

    /// Every cached match under `root`, in document order.
    ///
    /// Entries whose node has left the document are evicted on the way.
    pub fn matches_within<D: Dom + ?Sized>(&mut self, dom: &D, root: NodeId) -> Vec<Match> {
        let mut matches = Vec::new();
        let sources = [
            (MatchSource::Text, &mut self.text),
            (MatchSource::ImageAlt, &mut self.images),
            (MatchSource::Explicit, &mut self.explicit),
        ];

        for (source, cache) in sources {
            for node in cache.nodes() {
                if !dom.is_connected(node) {
                    cache.remove(node);
                    self.stats.evictions += 1;
                    continue;
                }
                if !dom.contains(root, node) {
                    continue;
                }
                let element = match source {
                    MatchSource::Text => match dom.parent(node).filter(|p| dom.is_element(*p)) {
                        Some(parent) => parent,
                        None => continue,
                    },
                    MatchSource::ImageAlt | MatchSource::Explicit => node,
                };
                if let Some(entry) = cache.get(node) {
                    matches.push(Match {
                        node,
                        element,
                        source,
                        info: entry.info.clone(),
                        cleaned: entry.cleaned.clone(),
                    });
                }
            }
        }

        let order: HashMap<NodeId, usize> = tree::descendants(dom, root)
            .into_iter()
            .enumerate()
            .map(|(position, node)| (node, position))
            .collect();
        matches.sort_by_key(|m| (order.get(&m.node).copied(), m.source as u8));
        matches
    }

    /// Explicit metadata cached for `element`, if any.
    pub fn explicit_info(&self, element: NodeId) -> Option<&DecodedInfo> {
        self.explicit.get(element).map(|entry| &entry.info)
    }

    /// Cached entry for a tracked text node or image.
    pub fn entry(&self, node: NodeId) -> Option<&CacheEntry> {
        self.text
            .get(node)
            .or_else(|| self.images.get(node))
            .or_else(|| self.explicit.get(node))
    }

    pub fn len(&self) -> usize {
        self.text.len() + self.images.len() + self.explicit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.images.clear();
        self.explicit.clear();
    }
}

#[derive(Debug, Clone, Copy)]
enum CacheSlot {
    Text,
    Images,
}

fn forget(cache: &mut NodeCache, node: NodeId) -> Evaluation {
    match cache.remove(node) {
        Some(_) => Evaluation::Cleared,
        None => Evaluation::Unmatched,
    }
}
