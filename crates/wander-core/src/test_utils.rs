//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::SimConfig;
use crate::evolution::GrowthStrategy;
use crate::graph::WalkGraph;
use crate::id::NodeId;
use crate::simulation::Simulation;
use crate::snapshot::Snapshot;

// ===========================================================================
// Configurations
// ===========================================================================

/// Default configuration with the given seed.
pub fn seeded(seed: u64) -> SimConfig {
    SimConfig {
        random_seed: seed,
        ..SimConfig::default()
    }
}

/// No growth at all: the graph stays as seeded.
pub fn frozen(initial_node_count: u32) -> SimConfig {
    SimConfig {
        initial_node_count,
        node_add_probability: 0.0,
        edge_add_probability: 0.0,
        ..SimConfig::default()
    }
}

/// Every knob turned on, for exercising all code paths at once.
pub fn busy(strategy: GrowthStrategy, seed: u64) -> SimConfig {
    SimConfig {
        growth_strategy: strategy,
        random_seed: seed,
        node_add_probability: 0.5,
        edge_add_probability: 0.5,
        edge_weight_range: (1.0, 10.0),
        max_degree: 6,
        attachment_count: 3,
        degree_exponent: 1.0,
        activity_exponent: 0.5,
        teleport_probability: 0.1,
        stay_probability: 0.05,
        path_capacity: Some(64),
        ..SimConfig::default()
    }
}

// ===========================================================================
// Graph builders
// ===========================================================================

/// A path 0 - 1 - ... - (n-1) with unit weights.
pub fn line_graph(n: usize) -> (WalkGraph, Vec<NodeId>) {
    let mut graph = WalkGraph::new();
    let nodes: Vec<NodeId> = (0..n).map(|_| graph.add_node()).collect();
    for pair in nodes.windows(2) {
        graph
            .add_edge(pair[0], pair[1], 1.0)
            .expect("fresh nodes connect");
    }
    (graph, nodes)
}

/// A hub (first node) connected to `leaves` leaves.
pub fn star_graph(leaves: usize) -> (WalkGraph, Vec<NodeId>) {
    let mut graph = WalkGraph::new();
    let nodes: Vec<NodeId> = (0..=leaves).map(|_| graph.add_node()).collect();
    for &leaf in &nodes[1..] {
        graph
            .add_edge(nodes[0], leaf, 1.0)
            .expect("fresh nodes connect");
    }
    (graph, nodes)
}

// ===========================================================================
// Running and checking
// ===========================================================================

/// Build a simulation and step it `ticks` times, collecting every snapshot.
pub fn run_snapshots(config: SimConfig, ticks: u64) -> Vec<std::sync::Arc<Snapshot>> {
    let mut sim = Simulation::new(config).expect("valid config");
    let mut out = vec![sim.snapshot()];
    for _ in 0..ticks {
        sim.step().expect("tick succeeds");
        out.push(sim.snapshot());
    }
    out
}

/// Assert the structural invariants of a graph: cached degrees match
/// adjacency, edges are normalized, reference live nodes and are unique.
pub fn assert_graph_invariants(graph: &WalkGraph) {
    for (id, data) in graph.nodes() {
        let neighbors = graph.neighbors(id).expect("live node");
        assert_eq!(data.degree as usize, neighbors.len(), "degree cache of {id}");
        assert!(data.activity >= 0.0, "negative activity on {id}");
    }
    let mut seen = std::collections::BTreeSet::new();
    for (_, edge) in graph.edges() {
        assert!(edge.a < edge.b, "edge {} -- {} not normalized", edge.a, edge.b);
        assert!(graph.contains_node(edge.a) && graph.contains_node(edge.b));
        assert!(seen.insert((edge.a, edge.b)), "duplicate edge");
        assert!(edge.weight.is_finite() && edge.weight > 0.0);
    }
}

/// Assert the invariants a snapshot must satisfy on its own. The degree cap
/// only holds for runs without external connects.
pub fn assert_snapshot_invariants(snapshot: &Snapshot, max_degree: u32) {
    assert!(snapshot.node(snapshot.walker.position).is_some(), "walker off graph");
    for node in &snapshot.nodes {
        let incident = snapshot
            .edges
            .iter()
            .filter(|e| e.a == node.id || e.b == node.id)
            .count();
        assert_eq!(node.degree as usize, incident);
        assert!(node.activity >= 0.0);
    }
    for node in &snapshot.nodes {
        assert!(node.degree <= max_degree, "{} over max degree", node.id);
    }
}
