use crate::id::{ComponentId, EdgeId, NodeId};
use crate::sim::Ticks;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::btree_map::Keys;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// The thing an invalid reference pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphRef {
    /// A node that does not exist.
    Node(NodeId),
    /// An edge whose endpoints are the same node.
    SelfLoop(NodeId),
    /// An edge that does not exist.
    Edge(NodeId, NodeId),
}

impl fmt::Display for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphRef::Node(n) => write!(f, "node {n} does not exist"),
            GraphRef::SelfLoop(n) => write!(f, "self-loop on node {n}"),
            GraphRef::Edge(a, b) => write!(f, "edge {a} -- {b} does not exist"),
        }
    }
}

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("invalid reference: {0}")]
    InvalidReference(GraphRef),
    #[error("duplicate edge: {0} -- {1}")]
    DuplicateEdge(NodeId, NodeId),
    #[error("invalid edge weight: {0} (must be finite and positive)")]
    InvalidWeight(f64),
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// Per-node data stored in the walk graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Tick at which the node was created.
    pub created_at: Ticks,
    /// Decayed visitation score. Never negative.
    pub activity: f64,
    /// Cached neighbor count, kept in sync by every edge mutation.
    pub degree: u32,
}

/// Per-edge data. Endpoints are stored normalized so that `a < b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub a: NodeId,
    pub b: NodeId,
    pub weight: f64,
    pub created_at: Ticks,
}

impl EdgeData {
    /// The endpoint opposite `node`, or `None` if `node` is not an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

pub(crate) fn ordered(u: NodeId, v: NodeId) -> (NodeId, NodeId) {
    if u < v { (u, v) } else { (v, u) }
}

// ---------------------------------------------------------------------------
// WalkGraph
// ---------------------------------------------------------------------------

/// The evolving undirected graph the walker moves through.
///
/// Nodes live in a `BTreeMap` keyed by monotonically assigned [`NodeId`]s so
/// that every iteration is in creation order and therefore deterministic.
/// Edges live in a `SlotMap`; adjacency maps each node to its neighbors and
/// the key of the connecting edge.
///
/// Connected components are cached and recomputed lazily: every topology
/// change only flips a dirty flag, and the next component query pays for
/// one BFS over the whole graph.
#[derive(Debug, Clone)]
pub struct WalkGraph {
    nodes: BTreeMap<NodeId, NodeData>,
    edges: SlotMap<EdgeId, EdgeData>,
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, EdgeId>>,

    /// Next id handed out by `add_node`. Only ever increases.
    next_node: u64,
    /// Creation stamp for new nodes and edges, set by the driver each tick.
    clock: Ticks,

    /// Cached component membership. Valid only while `components_dirty` is false.
    component_cache: BTreeMap<NodeId, ComponentId>,
    component_count: usize,
    components_dirty: bool,
}

impl Default for WalkGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkGraph {
    /// Create a new, empty graph with the clock at tick 0.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: SlotMap::with_key(),
            adjacency: BTreeMap::new(),
            next_node: 0,
            clock: 0,
            component_cache: BTreeMap::new(),
            component_count: 0,
            components_dirty: true,
        }
    }

    fn invalidate_components(&mut self) {
        self.components_dirty = true;
    }

    /// Set the tick used to stamp newly created nodes and edges and to
    /// derive node ages.
    pub fn set_clock(&mut self, tick: Ticks) {
        self.clock = tick;
    }

    /// The current clock stamp.
    pub fn clock(&self) -> Ticks {
        self.clock
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add an isolated node stamped with the current clock.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            NodeData {
                created_at: self.clock,
                activity: 0.0,
                degree: 0,
            },
        );
        self.adjacency.insert(id, BTreeMap::new());
        self.invalidate_components();
        id
    }

    /// Connect two distinct existing nodes.
    ///
    /// # Errors
    ///
    /// - [`GraphError::InvalidReference`] if either node is missing or `u == v`.
    /// - [`GraphError::DuplicateEdge`] if the nodes are already connected.
    /// - [`GraphError::InvalidWeight`] if `weight` is not finite and positive.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, weight: f64) -> Result<EdgeId, GraphError> {
        self.check_edge(u, v, weight)?;

        let (a, b) = ordered(u, v);
        let edge_id = self.edges.insert(EdgeData {
            a,
            b,
            weight,
            created_at: self.clock,
        });
        for (from, to) in [(a, b), (b, a)] {
            if let Some(adj) = self.adjacency.get_mut(&from) {
                adj.insert(to, edge_id);
            }
            if let Some(node) = self.nodes.get_mut(&from) {
                node.degree += 1;
            }
        }

        self.invalidate_components();
        Ok(edge_id)
    }

    /// Remove the edge between `u` and `v`, returning its data.
    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) -> Result<EdgeData, GraphError> {
        let edge_id = self
            .adjacency
            .get(&u)
            .and_then(|adj| adj.get(&v))
            .copied()
            .ok_or(GraphError::InvalidReference(GraphRef::Edge(u, v)))?;
        self.remove_edge_by_id(edge_id)
            .ok_or(GraphError::InvalidReference(GraphRef::Edge(u, v)))
    }

    fn remove_edge_by_id(&mut self, edge_id: EdgeId) -> Option<EdgeData> {
        let data = self.edges.remove(edge_id)?;
        for (from, to) in [(data.a, data.b), (data.b, data.a)] {
            if let Some(adj) = self.adjacency.get_mut(&from) {
                adj.remove(&to);
            }
            if let Some(node) = self.nodes.get_mut(&from) {
                node.degree -= 1;
            }
        }
        self.invalidate_components();
        Some(data)
    }

    /// Remove a node and all of its incident edges.
    ///
    /// The graph knows nothing about the walker: callers must move the
    /// walker off `node` first.
    pub fn remove_node(&mut self, node: NodeId) -> Result<NodeData, GraphError> {
        self.require_node(node)?;

        let incident: Vec<EdgeId> = self
            .adjacency
            .get(&node)
            .map(|adj| adj.values().copied().collect())
            .unwrap_or_default();
        for edge_id in incident {
            self.remove_edge_by_id(edge_id);
        }

        self.adjacency.remove(&node);
        self.invalidate_components();
        self.nodes
            .remove(&node)
            .ok_or(GraphError::InvalidReference(GraphRef::Node(node)))
    }

    /// Change the weight of an existing edge.
    pub fn set_weight(&mut self, u: NodeId, v: NodeId, weight: f64) -> Result<(), GraphError> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(GraphError::InvalidWeight(weight));
        }
        let edge_id = self
            .edge_id_between(u, v)
            .ok_or(GraphError::InvalidReference(GraphRef::Edge(u, v)))?;
        if let Some(edge) = self.edges.get_mut(edge_id) {
            edge.weight = weight;
        }
        Ok(())
    }

    /// Multiply every node's activity by `factor`. Called once per tick.
    pub fn decay_activity(&mut self, factor: f64) {
        for node in self.nodes.values_mut() {
            node.activity *= factor;
        }
    }

    /// Add `amount` to a node's activity.
    pub fn record_visit(&mut self, node: NodeId, amount: f64) -> Result<(), GraphError> {
        let data = self
            .nodes
            .get_mut(&node)
            .ok_or(GraphError::InvalidReference(GraphRef::Node(node)))?;
        data.activity += amount;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Check that `add_edge(u, v, weight)` would succeed, without mutating.
    pub fn check_edge(&self, u: NodeId, v: NodeId, weight: f64) -> Result<(), GraphError> {
        self.require_node(u)?;
        self.require_node(v)?;
        if u == v {
            return Err(GraphError::InvalidReference(GraphRef::SelfLoop(u)));
        }
        if self.has_edge(u, v) {
            let (a, b) = ordered(u, v);
            return Err(GraphError::DuplicateEdge(a, b));
        }
        if !(weight.is_finite() && weight > 0.0) {
            return Err(GraphError::InvalidWeight(weight));
        }
        Ok(())
    }

    fn require_node(&self, node: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes
            .get(&node)
            .ok_or(GraphError::InvalidReference(GraphRef::Node(node)))
    }

    /// Get the node data for a given node ID.
    pub fn get_node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(&node)
    }

    /// Returns true if the node exists in the graph.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Returns true if `u` and `v` are connected. Order does not matter.
    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.edge_id_between(u, v).is_some()
    }

    fn edge_id_between(&self, u: NodeId, v: NodeId) -> Option<EdgeId> {
        self.adjacency.get(&u).and_then(|adj| adj.get(&v)).copied()
    }

    /// Get the edge connecting `u` and `v`, if any.
    pub fn edge_between(&self, u: NodeId, v: NodeId) -> Option<&EdgeData> {
        self.edge_id_between(u, v).and_then(|id| self.edges.get(id))
    }

    /// Weight of the edge between `u` and `v`.
    pub fn edge_weight(&self, u: NodeId, v: NodeId) -> Result<f64, GraphError> {
        self.edge_between(u, v)
            .map(|e| e.weight)
            .ok_or(GraphError::InvalidReference(GraphRef::Edge(u, v)))
    }

    /// Neighbors of `node` in ascending id order.
    pub fn neighbors(&self, node: NodeId) -> Result<Keys<'_, NodeId, EdgeId>, GraphError> {
        self.adjacency
            .get(&node)
            .map(|adj| adj.keys())
            .ok_or(GraphError::InvalidReference(GraphRef::Node(node)))
    }

    /// Cached degree of `node`.
    pub fn degree(&self, node: NodeId) -> Result<usize, GraphError> {
        self.require_node(node).map(|n| n.degree as usize)
    }

    /// Current decayed activity of `node`.
    pub fn activity(&self, node: NodeId) -> Result<f64, GraphError> {
        self.require_node(node).map(|n| n.activity)
    }

    /// Ticks elapsed since `node` was created.
    pub fn age(&self, node: NodeId) -> Result<Ticks, GraphError> {
        self.require_node(node)
            .map(|n| self.clock.saturating_sub(n.created_at))
    }

    /// Total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The id the next `add_node` call will return.
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_node)
    }

    /// Iterate over all nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter().map(|(&id, data)| (id, data))
    }

    /// Iterate over all node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Iterate over all edges in slot order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeData)> {
        self.edges.iter()
    }

    /// Endpoints of every edge as `(a, b)` with `a < b`, in ascending order.
    /// Unlike [`edges`](Self::edges) the order does not depend on slot reuse.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.adjacency.iter().flat_map(|(&a, adj)| {
            adj.range((std::ops::Bound::Excluded(a), std::ops::Bound::Unbounded))
                .map(move |(&b, _)| (a, b))
        })
    }

    /// Nodes reachable from `from` in at most `max_hops` edges, excluding
    /// `from` itself, in ascending id order.
    pub fn within_hops(&self, from: NodeId, max_hops: u32) -> Result<Vec<NodeId>, GraphError> {
        self.require_node(from)?;
        let mut depth: BTreeMap<NodeId, u32> = BTreeMap::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        depth.insert(from, 0);
        queue.push_back(from);

        while let Some(node) = queue.pop_front() {
            let d = depth.get(&node).copied().unwrap_or(0);
            if d >= max_hops {
                continue;
            }
            let Some(adj) = self.adjacency.get(&node) else {
                continue;
            };
            for &neighbor in adj.keys() {
                if !depth.contains_key(&neighbor) {
                    depth.insert(neighbor, d + 1);
                    queue.push_back(neighbor);
                }
            }
        }

        depth.remove(&from);
        Ok(depth.into_keys().collect())
    }

    // -----------------------------------------------------------------------
    // Connected components (lazy)
    // -----------------------------------------------------------------------

    /// Component id of `node`, recomputing the cache if the topology changed.
    pub fn component_id(&mut self, node: NodeId) -> Result<ComponentId, GraphError> {
        self.require_node(node)?;
        self.refresh_components();
        self.component_cache
            .get(&node)
            .copied()
            .ok_or(GraphError::InvalidReference(GraphRef::Node(node)))
    }

    /// Component membership for every node.
    pub fn components(&mut self) -> &BTreeMap<NodeId, ComponentId> {
        self.refresh_components();
        &self.component_cache
    }

    /// Number of connected components.
    pub fn component_count(&mut self) -> usize {
        self.refresh_components();
        self.component_count
    }

    fn refresh_components(&mut self) {
        if self.components_dirty {
            self.recompute_components();
            self.components_dirty = false;
        }
    }

    /// BFS from every unvisited node in ascending id order, so a component's
    /// id is ordered by its smallest member.
    fn recompute_components(&mut self) {
        let mut membership: BTreeMap<NodeId, ComponentId> = BTreeMap::new();
        let mut next = 0u32;
        let mut queue: VecDeque<NodeId> = VecDeque::new();

        for &root in self.nodes.keys() {
            if membership.contains_key(&root) {
                continue;
            }
            let component = ComponentId(next);
            next += 1;
            membership.insert(root, component);
            queue.push_back(root);

            while let Some(node) = queue.pop_front() {
                let Some(adj) = self.adjacency.get(&node) else {
                    continue;
                };
                for &neighbor in adj.keys() {
                    if !membership.contains_key(&neighbor) {
                        membership.insert(neighbor, component);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        self.component_cache = membership;
        self.component_count = next as usize;
    }
}
