use content_link_dom::NodeId;
use serde::Serialize;

/// What triggered a marking pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "camelCase")]
pub enum MarkScope {
    Full,
    Subtree(NodeId),
    Mutations,
}

/// Result of one marking pass; the payload of `ready` and `marked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSummary {
    /// Distinct edit targets under the root after the pass
    pub editable_total: usize,
    /// Elements stamped for the first time
    pub generated_stamped: usize,
    /// Already-stamped elements whose metadata changed
    pub generated_updated: usize,
    /// Stamped elements that lost their match
    pub generated_cleared: usize,
    pub explicit_total: usize,
    pub scope: MarkScope,
}

impl MarkSummary {
    pub fn new(scope: MarkScope) -> Self {
        Self {
            editable_total: 0,
            generated_stamped: 0,
            generated_updated: 0,
            generated_cleared: 0,
            explicit_total: 0,
            scope,
        }
    }
}
