use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Storage key for an edge in the walk graph. The logical identity of an
    /// edge is its endpoint pair; this key only addresses the slot.
    pub struct EdgeId;
}

/// Identifies a node in the walk graph.
///
/// Assigned monotonically by the graph store and never reused, so a stale id
/// held by the walker or an observer can never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifies a connected component. Only meaningful until the next topology
/// change; ids are reassigned on every recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_order_by_assignment() {
        assert!(NodeId(3) < NodeId(4));
        assert_eq!(NodeId(7), NodeId(7));
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId(12).to_string(), "n12");
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(NodeId(0), "hub");
        map.insert(NodeId(1), "leaf");
        assert_eq!(map[&NodeId(0)], "hub");
    }
}
