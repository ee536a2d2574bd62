//! Child-list mutation records.
//!
//! The document queues a record whenever the children of an observed node
//! change. [`Page`](crate::Page) hands queued records to observers on the
//! next turn of its event loop.

use slotmap::new_key_type;

use crate::NodeId;

new_key_type! {
    /// Handle returned by [`Page::observe`](crate::Page::observe).
    pub struct ObserverId;
}

/// One change to the child list of an observed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose children changed.
    pub target: NodeId,
    /// Nodes inserted into `target`, in document order.
    pub added: Vec<NodeId>,
    /// Nodes taken out of `target`. They may no longer exist.
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    pub(crate) fn added(target: NodeId, added: Vec<NodeId>) -> Self {
        Self {
            target,
            added,
            removed: Vec::new(),
        }
    }

    pub(crate) fn removed(target: NodeId, removed: Vec<NodeId>) -> Self {
        Self {
            target,
            added: Vec::new(),
            removed,
        }
    }
}
