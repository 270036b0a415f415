//! Walker state: position, bounded path history, memory and last step.

use crate::id::NodeId;
use crate::memory::WalkerMemory;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How the walker reached its current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Moved along an edge to a neighbor.
    Moved,
    /// Chose to remain in place.
    Stayed,
    /// Teleported because the current node had no neighbors.
    Teleported,
    /// Voluntary random jump.
    Jumped,
}

impl StepKind {
    /// Whether this step left the graph's edges.
    pub fn is_teleport(self) -> bool {
        matches!(self, StepKind::Teleported | StepKind::Jumped)
    }
}

/// One completed walk step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: StepKind,
}

/// The single agent moving through the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walker {
    position: NodeId,
    path: VecDeque<NodeId>,
    path_capacity: Option<usize>,
    memory: WalkerMemory,
    teleported: bool,
    last_step: Option<StepKind>,
}

impl Walker {
    /// Place a walker on `start`. The start node opens the path and is
    /// remembered at full weight.
    pub fn new(start: NodeId, path_capacity: Option<usize>, mut memory: WalkerMemory) -> Self {
        memory.remember(start);
        let mut path = VecDeque::new();
        path.push_back(start);
        Self {
            position: start,
            path,
            path_capacity,
            memory,
            teleported: false,
            last_step: None,
        }
    }

    pub fn position(&self) -> NodeId {
        self.position
    }

    /// Visited nodes, oldest first.
    pub fn path(&self) -> &VecDeque<NodeId> {
        &self.path
    }

    pub fn memory(&self) -> &WalkerMemory {
        &self.memory
    }

    /// Whether the most recent step was a teleport.
    pub fn teleported(&self) -> bool {
        self.teleported
    }

    /// Kind of the most recent step, `None` before the first step.
    pub fn last_step(&self) -> Option<StepKind> {
        self.last_step
    }

    /// Apply a completed step: move, extend the path and update memory.
    pub fn record(&mut self, step: StepRecord) {
        self.position = step.to;
        self.teleported = step.kind.is_teleport();
        self.last_step = Some(step.kind);
        self.push_path(step.to);
        self.memory.remember(step.to);
    }

    /// Move the walker off a node that is about to disappear. Not a step:
    /// memory and step flags are untouched.
    pub fn relocate(&mut self, node: NodeId) {
        self.position = node;
        self.push_path(node);
    }

    /// Drop a removed node from memory.
    pub fn forget(&mut self, node: NodeId) {
        self.memory.forget(node);
    }

    fn push_path(&mut self, node: NodeId) {
        self.path.push_back(node);
        if let Some(cap) = self.path_capacity {
            while self.path.len() > cap {
                self.path.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker(cap: Option<usize>) -> Walker {
        Walker::new(NodeId(0), cap, WalkerMemory::new(0.9, 0.05))
    }

    fn step(from: u64, to: u64, kind: StepKind) -> StepRecord {
        StepRecord {
            from: NodeId(from),
            to: NodeId(to),
            kind,
        }
    }

    #[test]
    fn starts_on_start_node() {
        let w = walker(None);
        assert_eq!(w.position(), NodeId(0));
        assert_eq!(w.path().len(), 1);
        assert_eq!(w.memory().weight(NodeId(0)), 1.0);
        assert!(!w.teleported());
        assert_eq!(w.last_step(), None);
    }

    #[test]
    fn record_updates_flags() {
        let mut w = walker(None);
        w.record(step(0, 3, StepKind::Teleported));
        assert!(w.teleported());
        assert_eq!(w.position(), NodeId(3));

        w.record(step(3, 3, StepKind::Stayed));
        assert!(!w.teleported());
        assert_eq!(w.last_step(), Some(StepKind::Stayed));

        w.record(step(3, 1, StepKind::Jumped));
        assert!(w.teleported());
        assert_eq!(w.path().iter().copied().collect::<Vec<_>>(), [0, 3, 3, 1].map(NodeId));
    }

    #[test]
    fn path_respects_capacity() {
        let mut w = walker(Some(3));
        for i in 1..10 {
            w.record(step(i - 1, i, StepKind::Moved));
            assert!(w.path().len() <= 3);
        }
        assert_eq!(w.path().iter().copied().collect::<Vec<_>>(), [7, 8, 9].map(NodeId));
    }

    #[test]
    fn relocate_keeps_memory_and_flags() {
        let mut w = walker(None);
        w.record(step(0, 2, StepKind::Jumped));
        w.relocate(NodeId(4));
        assert_eq!(w.position(), NodeId(4));
        assert!(w.teleported());
        assert_eq!(w.memory().weight(NodeId(4)), 0.0);
        w.forget(NodeId(2));
        assert_eq!(w.memory().weight(NodeId(2)), 0.0);
    }
}
