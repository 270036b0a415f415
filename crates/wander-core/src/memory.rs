//! Short-term walker memory with exponential decay.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decaying record of recently visited nodes.
///
/// Every [`remember`](WalkerMemory::remember) decays all entries by the
/// configured factor, stamps the visited node at weight 1.0 and then evicts
/// entries that fell below the threshold. Stored weights therefore always lie
/// in `[threshold, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerMemory {
    weights: BTreeMap<NodeId, f64>,
    decay: f64,
    threshold: f64,
}

impl WalkerMemory {
    pub fn new(decay: f64, threshold: f64) -> Self {
        Self {
            weights: BTreeMap::new(),
            decay,
            threshold,
        }
    }

    /// Record a visit to `node`.
    pub fn remember(&mut self, node: NodeId) {
        for weight in self.weights.values_mut() {
            *weight *= self.decay;
        }
        self.weights.insert(node, 1.0);
        let threshold = self.threshold;
        self.weights.retain(|_, w| *w >= threshold);
    }

    /// Memory weight of `node`, 0 if it is not remembered.
    pub fn weight(&self, node: NodeId) -> f64 {
        self.weights.get(&node).copied().unwrap_or(0.0)
    }

    /// Drop `node`, e.g. after it was removed from the graph.
    pub fn forget(&mut self, node: NodeId) -> bool {
        self.weights.remove(&node).is_some()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Entries in ascending node order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.weights.iter().map(|(&n, &w)| (n, w))
    }

    /// Upper bound on the number of entries when one node is remembered per
    /// step: `ceil(ln(threshold) / ln(decay)) + 1`.
    pub fn capacity_bound(&self) -> usize {
        ((self.threshold.ln() / self.decay.ln()).ceil() as usize) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_node_has_zero_weight() {
        let memory = WalkerMemory::new(0.9, 0.05);
        assert_eq!(memory.weight(NodeId(3)), 0.0);
        assert!(memory.is_empty());
    }

    #[test]
    fn remember_decays_older_entries() {
        let mut memory = WalkerMemory::new(0.5, 0.05);
        memory.remember(NodeId(0));
        memory.remember(NodeId(1));
        assert_eq!(memory.weight(NodeId(1)), 1.0);
        assert_eq!(memory.weight(NodeId(0)), 0.5);
    }

    #[test]
    fn revisit_refreshes_weight() {
        let mut memory = WalkerMemory::new(0.5, 0.05);
        memory.remember(NodeId(0));
        memory.remember(NodeId(1));
        memory.remember(NodeId(0));
        assert_eq!(memory.weight(NodeId(0)), 1.0);
        assert_eq!(memory.weight(NodeId(1)), 0.5);
    }

    #[test]
    fn entries_below_threshold_are_evicted() {
        // 0.5^5 = 0.03125 < 0.05, so an entry survives four later visits.
        let mut memory = WalkerMemory::new(0.5, 0.05);
        memory.remember(NodeId(0));
        for i in 1..=4 {
            memory.remember(NodeId(i));
        }
        assert_eq!(memory.weight(NodeId(0)), 0.0625);
        memory.remember(NodeId(5));
        assert_eq!(memory.weight(NodeId(0)), 0.0);
        assert_eq!(memory.len(), 5);
    }

    #[test]
    fn size_stays_within_bound() {
        let mut memory = WalkerMemory::new(0.9, 0.05);
        let bound = memory.capacity_bound();
        for i in 0..500 {
            memory.remember(NodeId(i));
            assert!(memory.len() <= bound, "{} > {bound}", memory.len());
        }
    }

    #[test]
    fn forget_removes_entry() {
        let mut memory = WalkerMemory::new(0.9, 0.05);
        memory.remember(NodeId(2));
        assert!(memory.forget(NodeId(2)));
        assert!(!memory.forget(NodeId(2)));
        assert!(memory.is_empty());
    }
}
