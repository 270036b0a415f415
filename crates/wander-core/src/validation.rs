//! Determinism checking and snapshot comparison.
//!
//! Two simulations built from the same configuration must produce identical
//! snapshot sequences. These helpers run such pairs side by side and explain
//! where two snapshots differ.

use crate::config::SimConfig;
use crate::id::NodeId;
use crate::simulation::{SimError, Simulation};
use crate::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// Snapshot diff types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum NodeDiff {
    OnlyInA(NodeId),
    OnlyInB(NodeId),
    /// Present in both with different fields.
    StateMismatch { node: NodeId, description: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeDiff {
    OnlyInA(NodeId, NodeId),
    OnlyInB(NodeId, NodeId),
    StateMismatch {
        a: NodeId,
        b: NodeId,
        description: String,
    },
}

/// Full diff between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDiff {
    pub is_identical: bool,
    pub tick_matches: bool,
    pub node_diffs: Vec<NodeDiff>,
    pub edge_diffs: Vec<EdgeDiff>,
    /// Walker fields that differ, by name.
    pub walker_diffs: Vec<&'static str>,
}

/// Compare two snapshots field by field.
pub fn diff_snapshots(a: &Snapshot, b: &Snapshot) -> SnapshotDiff {
    let mut node_diffs = Vec::new();
    for na in &a.nodes {
        match b.node(na.id) {
            None => node_diffs.push(NodeDiff::OnlyInA(na.id)),
            Some(nb) => {
                let mut mismatches = Vec::new();
                if na.created_at != nb.created_at {
                    mismatches.push("created_at");
                }
                if na.degree != nb.degree {
                    mismatches.push("degree");
                }
                if na.activity.to_bits() != nb.activity.to_bits() {
                    mismatches.push("activity");
                }
                if na.component != nb.component {
                    mismatches.push("component");
                }
                if !mismatches.is_empty() {
                    node_diffs.push(NodeDiff::StateMismatch {
                        node: na.id,
                        description: mismatches.join(", "),
                    });
                }
            }
        }
    }
    for nb in &b.nodes {
        if a.node(nb.id).is_none() {
            node_diffs.push(NodeDiff::OnlyInB(nb.id));
        }
    }

    let mut edge_diffs = Vec::new();
    let find = |s: &Snapshot, x: NodeId, y: NodeId| {
        s.edges
            .binary_search_by_key(&(x, y), |e| (e.a, e.b))
            .ok()
            .map(|i| s.edges[i].clone())
    };
    for ea in &a.edges {
        match find(b, ea.a, ea.b) {
            None => edge_diffs.push(EdgeDiff::OnlyInA(ea.a, ea.b)),
            Some(eb) => {
                let mut mismatches = Vec::new();
                if ea.weight.to_bits() != eb.weight.to_bits() {
                    mismatches.push("weight");
                }
                if ea.created_at != eb.created_at {
                    mismatches.push("created_at");
                }
                if !mismatches.is_empty() {
                    edge_diffs.push(EdgeDiff::StateMismatch {
                        a: ea.a,
                        b: ea.b,
                        description: mismatches.join(", "),
                    });
                }
            }
        }
    }
    for eb in &b.edges {
        if find(a, eb.a, eb.b).is_none() {
            edge_diffs.push(EdgeDiff::OnlyInB(eb.a, eb.b));
        }
    }

    let (wa, wb) = (&a.walker, &b.walker);
    let mut walker_diffs = Vec::new();
    if wa.position != wb.position {
        walker_diffs.push("position");
    }
    if wa.path != wb.path {
        walker_diffs.push("path");
    }
    if wa.teleported != wb.teleported {
        walker_diffs.push("teleported");
    }
    if wa.step_kind != wb.step_kind {
        walker_diffs.push("step_kind");
    }
    if wa.memory != wb.memory {
        walker_diffs.push("memory");
    }

    let tick_matches = a.tick == b.tick;
    SnapshotDiff {
        is_identical: tick_matches
            && node_diffs.is_empty()
            && edge_diffs.is_empty()
            && walker_diffs.is_empty()
            && a.state_hash == b.state_hash,
        tick_matches,
        node_diffs,
        edge_diffs,
        walker_diffs,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    /// First tick at which the two runs disagreed.
    pub divergence_tick: Option<u64>,
    /// (tick, hash_run_a, hash_run_b) for every tick run.
    pub hash_log: Vec<(u64, u64, u64)>,
    /// Diff of the snapshots at the divergence tick.
    pub divergence: Option<SnapshotDiff>,
}

/// Run two simulations from `config` for `ticks` ticks and compare them
/// after every tick.
pub fn validate_determinism(config: &SimConfig, ticks: u64) -> Result<DeterminismResult, SimError> {
    let mut sim_a = Simulation::new(config.clone())?;
    let mut sim_b = Simulation::new(config.clone())?;

    let mut hash_log = Vec::new();
    let mut divergence_tick = None;
    let mut divergence = None;

    for _ in 0..ticks {
        let report_a = sim_a.step()?;
        let report_b = sim_b.step()?;
        hash_log.push((report_a.tick, report_a.state_hash, report_b.state_hash));

        if divergence_tick.is_none() {
            let diff = diff_snapshots(&sim_a.snapshot(), &sim_b.snapshot());
            if !diff.is_identical {
                divergence_tick = Some(report_a.tick);
                divergence = Some(diff);
            }
        }
    }

    Ok(DeterminismResult {
        is_deterministic: divergence_tick.is_none(),
        divergence_tick,
        hash_log,
        divergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::GrowthStrategy;

    fn run(config: SimConfig, ticks: u64) -> Simulation {
        let mut sim = Simulation::new(config).unwrap();
        for _ in 0..ticks {
            sim.step().unwrap();
        }
        sim
    }

    #[test]
    fn identical_runs_have_empty_diff() {
        let a = run(SimConfig::default(), 15);
        let b = run(SimConfig::default(), 15);
        let diff = diff_snapshots(&a.snapshot(), &b.snapshot());
        assert!(diff.is_identical, "{diff:?}");
    }

    #[test]
    fn different_ticks_detected() {
        let a = run(SimConfig::default(), 3);
        let b = run(SimConfig::default(), 4);
        let diff = diff_snapshots(&a.snapshot(), &b.snapshot());
        assert!(!diff.is_identical);
        assert!(!diff.tick_matches);
    }

    #[test]
    fn extra_node_reported() {
        let config = SimConfig {
            node_add_probability: 1.0,
            ..SimConfig::default()
        };
        let a = run(config.clone(), 2);
        let b = run(config, 3);
        let diff = diff_snapshots(&a.snapshot(), &b.snapshot());
        assert!(diff.node_diffs.contains(&NodeDiff::OnlyInB(NodeId(7))));
    }

    #[test]
    fn default_config_is_deterministic() {
        let result = validate_determinism(&SimConfig::default(), 40).unwrap();
        assert!(result.is_deterministic);
        assert_eq!(result.hash_log.len(), 40);
        assert!(result.divergence.is_none());
        for (_, a, b) in &result.hash_log {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn every_strategy_is_deterministic() {
        for strategy in [
            GrowthStrategy::Random,
            GrowthStrategy::PreferentialAttachment,
            GrowthStrategy::Aging,
        ] {
            let config = SimConfig {
                growth_strategy: strategy,
                teleport_probability: 0.1,
                stay_probability: 0.1,
                degree_exponent: 1.0,
                activity_exponent: 0.5,
                edge_weight_range: (1.0, 10.0),
                ..SimConfig::default()
            };
            let result = validate_determinism(&config, 50).unwrap();
            assert!(result.is_deterministic, "{strategy:?} diverged");
        }
    }

    #[test]
    fn invalid_config_is_error() {
        let config = SimConfig {
            initial_node_count: 0,
            ..SimConfig::default()
        };
        assert!(validate_determinism(&config, 5).is_err());
    }
}
