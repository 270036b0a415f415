//! Biased transition policy for the walker.
//!
//! A step at node `u` resolves in this order:
//!
//! 1. **Jump / stay** -- one uniform draw decides between a voluntary jump
//!    (`teleport_probability`), staying in place (`stay_probability`) or a
//!    regular move. No draw is made when both probabilities are 0.
//! 2. **Dead end** -- if `u` has no neighbors the walker teleports.
//! 3. **Move** -- a neighbor is sampled from [`WalkPolicy::transition_distribution`].
//!
//! Teleport targets prefer nodes outside `u`'s component, then any node
//! other than `u`. On a single-node graph the walker stays put but the step
//! still counts as a teleport. A voluntary jump with `max_teleport_distance`
//! set lands within that many hops of `u` instead, when such a node exists.
//!
//! Scores are combined in log space and shifted by the best candidate before
//! exponentiating, so extreme exponents cannot overflow a preferred
//! candidate's score to infinity.
//!
//! Every outcome is recorded on the walker and bumps the activity of the
//! node it lands on.

use crate::config::SimConfig;
use crate::graph::{GraphError, WalkGraph};
use crate::id::NodeId;
use crate::rng::SimRng;
use crate::walker::{StepKind, StepRecord, Walker};

/// Scoring and step parameters, fixed for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkPolicy {
    degree_exponent: f64,
    activity_exponent: f64,
    memory_penalty: f64,
    teleport_probability: f64,
    stay_probability: f64,
    max_teleport_distance: Option<u32>,
    activity_increment: f64,
}

/// `exponent * ln(base)`, with a zero exponent ignoring the factor even when
/// `base` is 0.
fn log_pow(base: f64, exponent: f64) -> f64 {
    if exponent == 0.0 {
        0.0
    } else {
        exponent * base.ln()
    }
}

impl WalkPolicy {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            degree_exponent: config.degree_exponent,
            activity_exponent: config.activity_exponent,
            memory_penalty: config.memory_penalty,
            teleport_probability: config.teleport_probability,
            stay_probability: config.stay_probability,
            max_teleport_distance: config.max_teleport_distance,
            activity_increment: config.activity_increment,
        }
    }

    /// Natural log of the unnormalized score of moving to neighbor `v`:
    ///
    /// `weight * (deg(v) / max_deg)^degree_exponent * activity(v)^activity_exponent
    /// * (1 - (1 - memory_penalty) * m(v))`
    ///
    /// A zero score is `-inf`.
    fn log_score(
        &self,
        graph: &WalkGraph,
        walker: &Walker,
        from: NodeId,
        to: NodeId,
        max_degree: f64,
    ) -> Result<f64, GraphError> {
        let weight = graph.edge_weight(from, to)?;
        let degree_bias = graph.degree(to)? as f64 / max_degree;
        let activity = graph.activity(to)?;
        let memory = 1.0 - (1.0 - self.memory_penalty) * walker.memory().weight(to);

        let log = weight.ln()
            + log_pow(degree_bias, self.degree_exponent)
            + log_pow(activity, self.activity_exponent)
            + memory.ln();
        Ok(if log.is_nan() { f64::NEG_INFINITY } else { log })
    }

    /// Normalized move probabilities over the walker's neighbors, in
    /// ascending node order. Empty at a dead end. Falls back to uniform when
    /// every score is zero.
    pub fn transition_distribution(
        &self,
        graph: &WalkGraph,
        walker: &Walker,
    ) -> Result<Vec<(NodeId, f64)>, GraphError> {
        let from = walker.position();
        let neighbors: Vec<NodeId> = graph.neighbors(from)?.copied().collect();
        if neighbors.is_empty() {
            return Ok(Vec::new());
        }

        let mut max_degree = 1usize;
        for &v in &neighbors {
            max_degree = max_degree.max(graph.degree(v)?);
        }
        let max_degree = max_degree as f64;

        let log_scores = neighbors
            .iter()
            .map(|&v| self.log_score(graph, walker, from, v, max_degree))
            .collect::<Result<Vec<_>, _>>()?;
        let top = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let distribution = if top.is_finite() {
            let scores: Vec<f64> = log_scores.iter().map(|&l| (l - top).exp()).collect();
            let total: f64 = scores.iter().sum();
            neighbors
                .into_iter()
                .zip(scores)
                .map(|(v, s)| (v, s / total))
                .collect()
        } else {
            let uniform = 1.0 / neighbors.len() as f64;
            neighbors.into_iter().map(|v| (v, uniform)).collect()
        };
        Ok(distribution)
    }

    /// Advance the walker by one step.
    pub fn step(
        &self,
        graph: &mut WalkGraph,
        walker: &mut Walker,
        rng: &mut SimRng,
    ) -> Result<StepRecord, GraphError> {
        let from = walker.position();

        let (to, kind) = match self.roll(rng) {
            Some(StepKind::Jumped) => (
                jump_target(graph, from, self.max_teleport_distance, rng)?,
                StepKind::Jumped,
            ),
            Some(StepKind::Stayed) => (from, StepKind::Stayed),
            _ => {
                let distribution = self.transition_distribution(graph, walker)?;
                if distribution.is_empty() {
                    (teleport_target(graph, from, rng)?, StepKind::Teleported)
                } else {
                    let probs: Vec<f64> = distribution.iter().map(|&(_, p)| p).collect();
                    let idx = rng
                        .choose_weighted(&probs)
                        .unwrap_or_else(|| rng.below(probs.len()));
                    (distribution[idx].0, StepKind::Moved)
                }
            }
        };

        if kind.is_teleport() {
            tracing::trace!(%from, %to, ?kind, "walker teleported");
        }

        let record = StepRecord { from, to, kind };
        walker.record(record);
        graph.record_visit(to, self.activity_increment)?;
        Ok(record)
    }

    /// Decide between a voluntary jump, a stay, or a regular move (`None`).
    fn roll(&self, rng: &mut SimRng) -> Option<StepKind> {
        if self.teleport_probability + self.stay_probability <= 0.0 {
            return None;
        }
        let r = rng.next_f64();
        if r < self.teleport_probability {
            Some(StepKind::Jumped)
        } else if r < self.teleport_probability + self.stay_probability {
            Some(StepKind::Stayed)
        } else {
            None
        }
    }
}

/// Pick a destination for a voluntary jump from `from`: uniformly among the
/// nodes within `max_distance` hops when a limit is set and any exist,
/// otherwise by [`teleport_target`].
pub fn jump_target(
    graph: &mut WalkGraph,
    from: NodeId,
    max_distance: Option<u32>,
    rng: &mut SimRng,
) -> Result<NodeId, GraphError> {
    if let Some(hops) = max_distance {
        let nearby = graph.within_hops(from, hops)?;
        if !nearby.is_empty() {
            return Ok(nearby[rng.below(nearby.len())]);
        }
    }
    teleport_target(graph, from, rng)
}

/// Pick a teleport destination for a walker leaving `from`: uniformly among
/// nodes outside its component if any, else among all other nodes, else
/// `from` itself.
pub fn teleport_target(
    graph: &mut WalkGraph,
    from: NodeId,
    rng: &mut SimRng,
) -> Result<NodeId, GraphError> {
    let home = graph.component_id(from)?;
    let outside: Vec<NodeId> = graph
        .components()
        .iter()
        .filter(|&(_, &c)| c != home)
        .map(|(&n, _)| n)
        .collect();
    if !outside.is_empty() {
        return Ok(outside[rng.below(outside.len())]);
    }

    let others: Vec<NodeId> = graph.node_ids().filter(|&n| n != from).collect();
    if others.is_empty() {
        return Ok(from);
    }
    Ok(others[rng.below(others.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::WalkerMemory;

    fn policy(config: SimConfig) -> WalkPolicy {
        WalkPolicy::from_config(&config)
    }

    fn walker_at(node: NodeId) -> Walker {
        Walker::new(node, None, WalkerMemory::new(0.9, 0.05))
    }

    /// Star: node 0 in the middle, nodes 1..=n around it.
    fn star(n: usize) -> (WalkGraph, Vec<NodeId>) {
        let mut graph = WalkGraph::new();
        let nodes: Vec<NodeId> = (0..=n).map(|_| graph.add_node()).collect();
        for &leaf in &nodes[1..] {
            graph.add_edge(nodes[0], leaf, 1.0).unwrap();
        }
        (graph, nodes)
    }

    fn neutral() -> SimConfig {
        SimConfig {
            memory_penalty: 1.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn distribution_is_normalized_and_weighted() {
        let (mut graph, n) = star(2);
        graph.set_weight(n[0], n[1], 3.0).unwrap();
        let walker = walker_at(n[0]);

        let dist = policy(neutral()).transition_distribution(&graph, &walker).unwrap();
        assert_eq!(dist[0].0, n[1]);
        assert_eq!(dist[1].0, n[2]);
        assert!((dist[0].1 - 0.75).abs() < 1e-12, "{dist:?}");
        assert!((dist[1].1 - 0.25).abs() < 1e-12, "{dist:?}");
    }

    #[test]
    fn memory_penalty_repels_recent_nodes() {
        let (graph, n) = star(2);
        let mut walker = walker_at(n[1]);
        walker.record(StepRecord {
            from: n[1],
            to: n[0],
            kind: StepKind::Moved,
        });
        // n1 remembered at 0.9, n2 unknown.
        let dist = policy(SimConfig {
            memory_penalty: 0.0,
            ..SimConfig::default()
        })
        .transition_distribution(&graph, &walker)
        .unwrap();
        let p1 = dist[0].1;
        let p2 = dist[1].1;
        assert!(p1 < p2, "{dist:?}");
    }

    #[test]
    fn memory_penalty_above_one_attracts() {
        let (graph, n) = star(2);
        let mut walker = walker_at(n[1]);
        walker.record(StepRecord {
            from: n[1],
            to: n[0],
            kind: StepKind::Moved,
        });
        let dist = policy(SimConfig {
            memory_penalty: 3.0,
            ..SimConfig::default()
        })
        .transition_distribution(&graph, &walker)
        .unwrap();
        assert!(dist[0].1 > dist[1].1, "{dist:?}");
    }

    #[test]
    fn zero_scores_fall_back_to_uniform() {
        let (graph, n) = star(3);
        // Activity is 0 everywhere, so a positive exponent zeroes every score.
        let dist = policy(SimConfig {
            activity_exponent: 1.0,
            ..neutral()
        })
        .transition_distribution(&graph, &walker_at(n[0]))
        .unwrap();
        for (_, p) in dist {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn degree_exponent_prefers_hubs() {
        // 0 - 1, 0 - 2, and 2 connected to 3 and 4.
        let mut graph = WalkGraph::new();
        let n: Vec<NodeId> = (0..5).map(|_| graph.add_node()).collect();
        graph.add_edge(n[0], n[1], 1.0).unwrap();
        graph.add_edge(n[0], n[2], 1.0).unwrap();
        graph.add_edge(n[2], n[3], 1.0).unwrap();
        graph.add_edge(n[2], n[4], 1.0).unwrap();

        let walker = walker_at(n[0]);
        let up = policy(SimConfig {
            degree_exponent: 1.0,
            ..neutral()
        })
        .transition_distribution(&graph, &walker)
        .unwrap();
        assert_eq!(up[0].0, n[1]);
        assert!((up[0].1 - 0.25).abs() < 1e-12);
        assert!((up[1].1 - 0.75).abs() < 1e-12);

        let down = policy(SimConfig {
            degree_exponent: -1.0,
            ..neutral()
        })
        .transition_distribution(&graph, &walker)
        .unwrap();
        assert!(down[0].1 > down[1].1);
    }

    #[test]
    fn extreme_degree_exponent_keeps_its_direction() {
        // u = 0 with neighbors 1 (degree 1) and 2 (degree 2, via 3).
        let mut graph = WalkGraph::new();
        let n: Vec<NodeId> = (0..4).map(|_| graph.add_node()).collect();
        graph.add_edge(n[0], n[1], 1.0).unwrap();
        graph.add_edge(n[0], n[2], 1.0).unwrap();
        graph.add_edge(n[2], n[3], 1.0).unwrap();
        let walker = walker_at(n[0]);

        let mild = policy(SimConfig {
            degree_exponent: -2.0,
            ..neutral()
        })
        .transition_distribution(&graph, &walker)
        .unwrap();
        assert!((mild[0].1 - 0.8).abs() < 1e-12, "{mild:?}");
        assert!((mild[1].1 - 0.2).abs() < 1e-12, "{mild:?}");

        // 0.5^-1100 overflows f64; the low-degree neighbor must still win.
        let extreme = policy(SimConfig {
            degree_exponent: -1100.0,
            ..neutral()
        })
        .transition_distribution(&graph, &walker)
        .unwrap();
        assert_eq!(extreme, vec![(n[1], 1.0), (n[2], 0.0)]);

        let hub = policy(SimConfig {
            degree_exponent: 1100.0,
            ..neutral()
        })
        .transition_distribution(&graph, &walker)
        .unwrap();
        assert_eq!(hub, vec![(n[1], 0.0), (n[2], 1.0)]);
    }

    #[test]
    fn dead_end_teleports_to_other_component() {
        let mut graph = WalkGraph::new();
        let n: Vec<NodeId> = (0..4).map(|_| graph.add_node()).collect();
        graph.add_edge(n[2], n[3], 1.0).unwrap();
        let mut walker = walker_at(n[0]);
        let mut rng = SimRng::new(8);

        for _ in 0..20 {
            let from = walker.position();
            if graph.degree(from).unwrap() > 0 {
                break;
            }
            let record = policy(neutral()).step(&mut graph, &mut walker, &mut rng).unwrap();
            assert_eq!(record.kind, StepKind::Teleported);
            assert_ne!(record.to, from);
            assert!(walker.teleported());
        }
    }

    #[test]
    fn single_node_dead_end_stays_but_teleports() {
        let mut graph = WalkGraph::new();
        let only = graph.add_node();
        let mut walker = walker_at(only);
        let mut rng = SimRng::new(1);

        let record = policy(neutral()).step(&mut graph, &mut walker, &mut rng).unwrap();
        assert_eq!(record.to, only);
        assert_eq!(record.kind, StepKind::Teleported);
        assert!(walker.teleported());
        assert_eq!(graph.activity(only).unwrap(), 1.0);
    }

    #[test]
    fn teleport_falls_back_to_any_other_node() {
        let (mut graph, n) = star(2);
        let mut rng = SimRng::new(4);
        for _ in 0..20 {
            let target = teleport_target(&mut graph, n[0], &mut rng).unwrap();
            assert_ne!(target, n[0]);
        }
    }

    #[test]
    fn stay_probability_one_never_moves() {
        let (mut graph, n) = star(2);
        let mut walker = walker_at(n[0]);
        let mut rng = SimRng::new(2);
        let p = policy(SimConfig {
            stay_probability: 1.0,
            ..neutral()
        });
        for _ in 0..10 {
            let record = p.step(&mut graph, &mut walker, &mut rng).unwrap();
            assert_eq!(record.kind, StepKind::Stayed);
            assert!(!walker.teleported());
        }
        assert_eq!(walker.position(), n[0]);
    }

    #[test]
    fn jump_probability_one_always_jumps() {
        let (mut graph, n) = star(3);
        let mut walker = walker_at(n[0]);
        let mut rng = SimRng::new(2);
        let p = policy(SimConfig {
            teleport_probability: 1.0,
            ..neutral()
        });
        let record = p.step(&mut graph, &mut walker, &mut rng).unwrap();
        assert_eq!(record.kind, StepKind::Jumped);
        assert_ne!(record.to, n[0]);
    }

    #[test]
    fn limited_jumps_stay_nearby() {
        // Path 0 - 1 - 2 - 3 - 4 plus a separate pair 5 - 6.
        let mut graph = WalkGraph::new();
        let n: Vec<NodeId> = (0..7).map(|_| graph.add_node()).collect();
        for i in 0..4 {
            graph.add_edge(n[i], n[i + 1], 1.0).unwrap();
        }
        graph.add_edge(n[5], n[6], 1.0).unwrap();

        let p = policy(SimConfig {
            teleport_probability: 1.0,
            max_teleport_distance: Some(2),
            ..neutral()
        });
        let mut rng = SimRng::new(13);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let mut walker = walker_at(n[0]);
            let record = p.step(&mut graph, &mut walker, &mut rng).unwrap();
            assert_eq!(record.kind, StepKind::Jumped);
            seen.insert(record.to);
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![n[1], n[2]]);
    }

    #[test]
    fn limited_jump_from_isolated_node_uses_teleport_rule() {
        let mut graph = WalkGraph::new();
        let n: Vec<NodeId> = (0..3).map(|_| graph.add_node()).collect();
        graph.add_edge(n[1], n[2], 1.0).unwrap();
        let mut rng = SimRng::new(5);
        for _ in 0..20 {
            let target = jump_target(&mut graph, n[0], Some(1), &mut rng).unwrap();
            assert_ne!(target, n[0]);
        }
    }

    #[test]
    fn dead_end_ignores_jump_limit() {
        // Walker on isolated 0; the limit only applies to voluntary jumps.
        let mut graph = WalkGraph::new();
        let n: Vec<NodeId> = (0..3).map(|_| graph.add_node()).collect();
        graph.add_edge(n[1], n[2], 1.0).unwrap();
        let p = policy(SimConfig {
            max_teleport_distance: Some(1),
            ..neutral()
        });
        let mut walker = walker_at(n[0]);
        let mut rng = SimRng::new(9);
        let record = p.step(&mut graph, &mut walker, &mut rng).unwrap();
        assert_eq!(record.kind, StepKind::Teleported);
        assert!(record.to == n[1] || record.to == n[2]);
    }

    #[test]
    fn moves_follow_edges_and_bump_activity() {
        let (mut graph, n) = star(4);
        let mut walker = walker_at(n[0]);
        let mut rng = SimRng::new(6);
        let p = policy(neutral());
        for _ in 0..10 {
            let record = p.step(&mut graph, &mut walker, &mut rng).unwrap();
            assert_eq!(record.kind, StepKind::Moved);
            assert!(graph.has_edge(record.from, record.to));
        }
        let total: f64 = graph.nodes().map(|(_, d)| d.activity).sum();
        assert_eq!(total, 10.0);
    }
}
