//! Immutable views of simulation state handed to observers.
//!
//! All types are owned copies, with no references into the live graph or
//! walker, so a snapshot can be shared (as `Arc<Snapshot>`) with renderers
//! and statistics collectors while the simulation keeps running.

use crate::command::AppliedMutation;
use crate::evolution::Mutation;
use crate::graph::WalkGraph;
use crate::id::{ComponentId, NodeId};
use crate::sim::{StateHash, Ticks};
use crate::walker::{StepKind, Walker};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub created_at: Ticks,
    pub age: Ticks,
    pub degree: u32,
    pub activity: f64,
    pub component: ComponentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    /// Lower endpoint.
    pub a: NodeId,
    /// Higher endpoint.
    pub b: NodeId,
    pub weight: f64,
    pub created_at: Ticks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerSnapshot {
    pub position: NodeId,
    /// Path history, oldest first. Copied on every capture, so an unbounded
    /// `path_capacity` makes long runs quadratic.
    pub path: Vec<NodeId>,
    pub teleported: bool,
    /// `None` before the first step.
    pub step_kind: Option<StepKind>,
    /// Memory entries in ascending node order.
    pub memory: Vec<(NodeId, f64)>,
}

/// Complete graph and walker state after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: Ticks,
    /// Nodes in ascending id order.
    pub nodes: Vec<NodeSnapshot>,
    /// Edges sorted by `(a, b)`.
    pub edges: Vec<EdgeSnapshot>,
    pub walker: WalkerSnapshot,
    /// What the growth rule did this tick.
    pub mutation: Mutation,
    /// External mutations applied in this tick's pre-tick phase.
    pub applied: Vec<AppliedMutation>,
    pub state_hash: u64,
}

impl Snapshot {
    /// Capture the current state. `rng_state` feeds the state hash so two
    /// runs only hash equal if their generators agree as well.
    pub(crate) fn capture(
        graph: &mut WalkGraph,
        walker: &Walker,
        mutation: Mutation,
        applied: Vec<AppliedMutation>,
        rng_state: u64,
    ) -> Self {
        let tick = graph.clock();
        let components = graph.components().clone();

        let nodes = graph
            .nodes()
            .map(|(id, data)| NodeSnapshot {
                id,
                created_at: data.created_at,
                age: tick.saturating_sub(data.created_at),
                degree: data.degree,
                activity: data.activity,
                component: components.get(&id).copied().unwrap_or(ComponentId(0)),
            })
            .collect();

        let mut edges: Vec<EdgeSnapshot> = graph
            .edges()
            .map(|(_, e)| EdgeSnapshot {
                a: e.a,
                b: e.b,
                weight: e.weight,
                created_at: e.created_at,
            })
            .collect();
        edges.sort_by_key(|e| (e.a, e.b));

        let walker = WalkerSnapshot {
            position: walker.position(),
            path: walker.path().iter().copied().collect(),
            teleported: walker.teleported(),
            step_kind: walker.last_step(),
            memory: walker.memory().iter().collect(),
        };

        let mut snapshot = Self {
            tick,
            nodes,
            edges,
            walker,
            mutation,
            applied,
            state_hash: 0,
        };
        snapshot.state_hash = snapshot.content_hash(rng_state);
        snapshot
    }

    /// FNV-1a hash over everything except `state_hash` itself.
    pub fn content_hash(&self, rng_state: u64) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.tick);
        h.write_u64(rng_state);

        for n in &self.nodes {
            h.write_u64(n.id.0);
            h.write_u64(n.created_at);
            h.write_u32(n.degree);
            h.write_f64(n.activity);
            h.write_u32(n.component.0);
        }
        for e in &self.edges {
            h.write_u64(e.a.0);
            h.write_u64(e.b.0);
            h.write_f64(e.weight);
            h.write_u64(e.created_at);
        }

        let w = &self.walker;
        h.write_u64(w.position.0);
        h.write_u32(w.teleported as u32);
        h.write_u32(match w.step_kind {
            None => 0,
            Some(StepKind::Moved) => 1,
            Some(StepKind::Stayed) => 2,
            Some(StepKind::Teleported) => 3,
            Some(StepKind::Jumped) => 4,
        });
        for node in &w.path {
            h.write_u64(node.0);
        }
        for &(node, weight) in &w.memory {
            h.write_u64(node.0);
            h.write_f64(weight);
        }
        h.finish()
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|i| &self.nodes[i])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct components.
    pub fn component_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.component)
            .max()
            .map_or(0, |c| c.0 as usize + 1)
    }
}
