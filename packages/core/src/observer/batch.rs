//! Coalescing of mutation records within one tick.
//!
//! Records are only collected here; nothing is read from the page until the
//! batch is planned, so whatever value a node has at flush time is the one
//! that gets processed ("last write wins"). Planning also makes sure no node
//! is visited twice: single-node updates inside a subtree that is rescanned
//! anyway are dropped, and nested rescan roots collapse into their ancestor.

use content_link_dom::{Dom, MutationRecord, NodeId};
use std::collections::BTreeSet;

#[derive(Debug, Default, Clone)]
pub struct MutationBatch {
    characters: BTreeSet<NodeId>,
    attributes: BTreeSet<NodeId>,
    added: BTreeSet<NodeId>,
    removed: BTreeSet<NodeId>,
    subtrees: BTreeSet<NodeId>,
    records: usize,
}

/// What a flush actually has to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Subtrees to walk in full, none nested in another
    pub rescan: Vec<NodeId>,
    /// Individual nodes outside every rescan root
    pub singles: Vec<NodeId>,
    /// Removed nodes that did not come back; their cache entries go
    pub purged: Vec<NodeId>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &MutationRecord) {
        self.records += 1;
        match record {
            MutationRecord::ChildList { added, removed, .. } => {
                self.added.extend(added.iter().copied());
                self.removed.extend(removed.iter().copied());
            }
            MutationRecord::CharacterData { target } => {
                self.characters.insert(*target);
            }
            MutationRecord::Attributes { target, .. } => {
                self.attributes.insert(*target);
            }
        }
    }

    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a MutationRecord>) {
        for record in records {
            self.push(record);
        }
    }

    /// Ask for a full re-walk of `root`.
    pub fn request_subtree(&mut self, root: NodeId) {
        self.subtrees.insert(root);
    }

    /// Roots passed to [`MutationBatch::request_subtree`].
    pub fn subtrees(&self) -> &BTreeSet<NodeId> {
        &self.subtrees
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
            && self.attributes.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.subtrees.is_empty()
    }

    pub fn plan<D: Dom + ?Sized>(&self, dom: &D) -> BatchPlan {
        let candidates: Vec<NodeId> = self
            .added
            .iter()
            .chain(self.subtrees.iter())
            .copied()
            .filter(|node| dom.is_connected(*node))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rescan: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|node| {
                !candidates
                    .iter()
                    .any(|other| other != node && dom.contains(*other, *node))
            })
            .collect();

        let covered = |node: NodeId| rescan.iter().any(|root| dom.contains(*root, node));

        let singles: Vec<NodeId> = self
            .characters
            .union(&self.attributes)
            .copied()
            .filter(|node| dom.is_connected(*node) && !covered(*node))
            .collect();

        let purged: Vec<NodeId> = self
            .removed
            .iter()
            .copied()
            .filter(|node| !dom.is_connected(*node))
            .collect();

        BatchPlan {
            rescan,
            singles,
            purged,
        }
    }
}
