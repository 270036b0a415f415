//! Growth rules applied to the walk graph once per tick.
//!
//! Each call to [`Evolution::apply`] performs at most one structural batch:
//! a new node with its attachment edges, a single new edge, one triangle
//! closing edge, or nothing. The engine only reads and writes the graph
//! store; it never sees the walker.

use crate::config::SimConfig;
use crate::graph::{GraphError, WalkGraph, ordered};
use crate::id::NodeId;
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Strategy and outcome types
// ---------------------------------------------------------------------------

/// Growth rule selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStrategy {
    /// Uniform attachment plus occasional random edges between existing nodes.
    #[default]
    Random,
    /// New nodes attach with probability proportional to degree.
    #[serde(rename = "preferential", alias = "preferential_attachment")]
    PreferentialAttachment,
    /// Preferential attachment damped by node age.
    Aging,
}

/// The structural change produced by one evolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mutation {
    /// Nothing changed this tick.
    #[default]
    None,
    /// A node was added and connected to `attached`, in draw order. An empty
    /// list means no eligible node was available.
    NodeAdded { node: NodeId, attached: Vec<NodeId> },
    /// A single edge was added between existing nodes (`a < b`).
    EdgeAdded { a: NodeId, b: NodeId },
    /// A triangle `a - via - b` was closed by adding the edge `a - b`
    /// (`a < b`).
    TriangleClosed { a: NodeId, b: NodeId, via: NodeId },
}

impl Mutation {
    /// Nodes created by this mutation.
    pub fn nodes_added(&self) -> usize {
        match self {
            Mutation::NodeAdded { .. } => 1,
            _ => 0,
        }
    }

    /// Edges created by this mutation.
    pub fn edges_added(&self) -> usize {
        match self {
            Mutation::None => 0,
            Mutation::NodeAdded { attached, .. } => attached.len(),
            Mutation::EdgeAdded { .. } | Mutation::TriangleClosed { .. } => 1,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Mutation::None)
    }
}

// ---------------------------------------------------------------------------
// Evolution engine
// ---------------------------------------------------------------------------

/// Random pair draws tried before a random edge falls back to listing every
/// unconnected eligible pair.
const EDGE_SAMPLE_ATTEMPTS: usize = 16;

/// Applies the configured growth rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Evolution {
    strategy: GrowthStrategy,
    max_degree: usize,
    attachment_count: usize,
    node_add_probability: f64,
    edge_add_probability: f64,
    triadic_probability: f64,
    edge_weight_range: (f64, f64),
    aging_exponent: f64,
}

impl Evolution {
    /// Build the engine from a validated configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            strategy: config.growth_strategy,
            max_degree: config.max_degree as usize,
            attachment_count: config.effective_attachment_count(),
            node_add_probability: config.node_add_probability,
            edge_add_probability: config.edge_add_probability,
            triadic_probability: config.triadic_probability,
            edge_weight_range: config.edge_weight_range,
            aging_exponent: config.aging_exponent,
        }
    }

    pub fn strategy(&self) -> GrowthStrategy {
        self.strategy
    }

    /// Run one evolution pass against `graph`.
    ///
    /// The triadic roll only happens on a tick where no other growth was
    /// rolled, so a tick never carries more than one batch.
    ///
    /// Graph errors cannot occur for a graph that satisfies its own
    /// invariants; they are propagated rather than ignored.
    pub fn apply(&self, graph: &mut WalkGraph, rng: &mut SimRng) -> Result<Mutation, GraphError> {
        match self.strategy {
            GrowthStrategy::Random => {
                let node_hit = rng.chance(self.node_add_probability);
                let edge_hit = rng.chance(self.edge_add_probability);
                if node_hit {
                    self.grow_node(graph, rng)
                } else if edge_hit {
                    self.grow_edge(graph, rng)
                } else if rng.chance(self.triadic_probability) {
                    self.close_triangle(graph, rng)
                } else {
                    Ok(Mutation::None)
                }
            }
            GrowthStrategy::PreferentialAttachment | GrowthStrategy::Aging => {
                if rng.chance(self.node_add_probability) {
                    self.grow_node(graph, rng)
                } else if rng.chance(self.triadic_probability) {
                    self.close_triangle(graph, rng)
                } else {
                    Ok(Mutation::None)
                }
            }
        }
    }

    fn accepts_edges(&self, graph: &WalkGraph, node: NodeId) -> Result<bool, GraphError> {
        Ok(graph.degree(node)? < self.max_degree)
    }

    /// Existing nodes that may still receive edges, in ascending id order.
    pub fn eligible(&self, graph: &WalkGraph) -> Vec<NodeId> {
        graph
            .nodes()
            .filter(|(_, data)| (data.degree as usize) < self.max_degree)
            .map(|(id, _)| id)
            .collect()
    }

    /// Attachment weight of an eligible node under the current strategy.
    pub fn attachment_weight(&self, graph: &WalkGraph, node: NodeId) -> Result<f64, GraphError> {
        let degree = graph.degree(node)? as f64;
        let weight = match self.strategy {
            GrowthStrategy::Random => 1.0,
            GrowthStrategy::PreferentialAttachment => degree,
            GrowthStrategy::Aging => {
                let age = graph.age(node)? as f64;
                degree / (age + 1.0).powf(self.aging_exponent)
            }
        };
        Ok(weight)
    }

    fn draw_weight(&self, rng: &mut SimRng) -> f64 {
        let (lo, hi) = self.edge_weight_range;
        rng.range_f64(lo, hi)
    }

    fn grow_node(&self, graph: &mut WalkGraph, rng: &mut SimRng) -> Result<Mutation, GraphError> {
        // The pool is fixed before the new node exists, so it can never
        // select itself.
        let pool = self.eligible(graph);
        let targets = match self.strategy {
            GrowthStrategy::Random => sample_uniform(pool, self.attachment_count, rng),
            GrowthStrategy::PreferentialAttachment | GrowthStrategy::Aging => {
                let weights = pool
                    .iter()
                    .map(|&n| self.attachment_weight(graph, n))
                    .collect::<Result<Vec<_>, _>>()?;
                sample_weighted(pool, weights, self.attachment_count, rng)
            }
        };

        let node = graph.add_node();
        for &target in &targets {
            let weight = self.draw_weight(rng);
            graph.add_edge(node, target, weight)?;
        }

        Ok(Mutation::NodeAdded {
            node,
            attached: targets,
        })
    }

    /// Connect a uniformly drawn unconnected pair of eligible nodes.
    ///
    /// Random pair draws are rejected while they hit an existing edge; only
    /// after [`EDGE_SAMPLE_ATTEMPTS`] misses (a dense pool) are all free
    /// pairs listed.
    fn grow_edge(&self, graph: &mut WalkGraph, rng: &mut SimRng) -> Result<Mutation, GraphError> {
        let pool = self.eligible(graph);
        if pool.len() < 2 {
            return Ok(Mutation::None);
        }

        for _ in 0..EDGE_SAMPLE_ATTEMPTS {
            let i = rng.below(pool.len());
            let mut j = rng.below(pool.len() - 1);
            if j >= i {
                j += 1;
            }
            let (a, b) = ordered(pool[i], pool[j]);
            if !graph.has_edge(a, b) {
                let weight = self.draw_weight(rng);
                graph.add_edge(a, b, weight)?;
                return Ok(Mutation::EdgeAdded { a, b });
            }
        }

        let mut pairs = Vec::new();
        for (i, &a) in pool.iter().enumerate() {
            for &b in &pool[i + 1..] {
                if !graph.has_edge(a, b) {
                    pairs.push((a, b));
                }
            }
        }
        if pairs.is_empty() {
            return Ok(Mutation::None);
        }

        let (a, b) = pairs[rng.below(pairs.len())];
        let weight = self.draw_weight(rng);
        graph.add_edge(a, b, weight)?;
        Ok(Mutation::EdgeAdded { a, b })
    }

    /// Draw an edge `u - v` uniformly and connect one endpoint to a neighbor
    /// of the other, closing a triangle. Both new endpoints must still be
    /// below `max_degree`.
    fn close_triangle(
        &self,
        graph: &mut WalkGraph,
        rng: &mut SimRng,
    ) -> Result<Mutation, GraphError> {
        let edges: Vec<(NodeId, NodeId)> = graph.edge_pairs().collect();
        if edges.is_empty() {
            return Ok(Mutation::None);
        }
        let (u, v) = edges[rng.below(edges.len())];

        // (endpoint, far node, shared neighbor)
        let mut closings = Vec::new();
        for (end, via) in [(v, u), (u, v)] {
            if !self.accepts_edges(graph, end)? {
                continue;
            }
            for &far in graph.neighbors(via)? {
                if far != end && !graph.has_edge(end, far) && self.accepts_edges(graph, far)? {
                    closings.push((end, far, via));
                }
            }
        }
        if closings.is_empty() {
            return Ok(Mutation::None);
        }

        let (end, far, via) = closings[rng.below(closings.len())];
        let weight = self.draw_weight(rng);
        graph.add_edge(end, far, weight)?;
        let (a, b) = ordered(end, far);
        Ok(Mutation::TriangleClosed { a, b, via })
    }
}

/// Draw `k` distinct entries uniformly (partial Fisher-Yates), in draw order.
fn sample_uniform(mut pool: Vec<NodeId>, k: usize, rng: &mut SimRng) -> Vec<NodeId> {
    let k = k.min(pool.len());
    for i in 0..k {
        let j = i + rng.below(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}

/// Draw `k` distinct entries with probability proportional to `weights`,
/// without replacement. Once only zero-weight entries remain the draw is
/// uniform over them.
fn sample_weighted(
    mut pool: Vec<NodeId>,
    mut weights: Vec<f64>,
    k: usize,
    rng: &mut SimRng,
) -> Vec<NodeId> {
    let k = k.min(pool.len());
    let mut chosen = Vec::with_capacity(k);
    for _ in 0..k {
        let idx = match rng.choose_weighted(&weights) {
            Some(idx) => idx,
            None => rng.below(pool.len()),
        };
        chosen.push(pool.remove(idx));
        weights.remove(idx);
    }
    chosen
}
