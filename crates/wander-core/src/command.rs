//! Externally submitted topology mutations.
//!
//! Mutations are validated when queued and applied by the driver at the
//! start of the next tick (the pre-tick phase), before evolution and the
//! walk step, so the walker never stands on a node removed mid-step.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mutation types
// ---------------------------------------------------------------------------

/// A topology change requested from outside the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExternalMutation {
    /// Remove a node and all of its edges.
    RemoveNode { node: NodeId },
    /// Remove the edge between two nodes.
    RemoveEdge { a: NodeId, b: NodeId },
    /// Connect two nodes with a new edge.
    Connect { a: NodeId, b: NodeId, weight: f64 },
}

/// An external mutation as it was actually applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppliedMutation {
    /// A node was removed together with `edges_removed` incident edges. If
    /// the walker stood on it, it was moved to `relocated_to` first.
    NodeRemoved {
        node: NodeId,
        edges_removed: usize,
        relocated_to: Option<NodeId>,
    },
    /// An edge was removed (`a < b`).
    EdgeRemoved { a: NodeId, b: NodeId },
    /// An edge was added (`a < b`).
    Connected { a: NodeId, b: NodeId },
}

impl AppliedMutation {
    pub fn nodes_removed(&self) -> usize {
        match self {
            AppliedMutation::NodeRemoved { .. } => 1,
            _ => 0,
        }
    }

    pub fn edges_removed(&self) -> usize {
        match self {
            AppliedMutation::NodeRemoved { edges_removed, .. } => *edges_removed,
            AppliedMutation::EdgeRemoved { .. } => 1,
            AppliedMutation::Connected { .. } => 0,
        }
    }

    pub fn edges_added(&self) -> usize {
        match self {
            AppliedMutation::Connected { .. } => 1,
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// MutationQueue
// ---------------------------------------------------------------------------

/// Mutations waiting for the next tick boundary.
#[derive(Debug, Clone, Default)]
pub struct MutationQueue {
    pending: Vec<ExternalMutation>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: ExternalMutation) {
        self.pending.push(mutation);
    }

    /// Take all pending mutations in submission order.
    pub fn drain(&mut self) -> Vec<ExternalMutation> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[ExternalMutation] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
