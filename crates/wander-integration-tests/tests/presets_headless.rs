//! Cross-crate headless runs of every built-in scenario.
//!
//! Each preset is loaded from `wander-data`, run through `wander-core` with a
//! `wander-stats` observer attached, and checked for structural invariants,
//! bookkeeping consistency and reproducibility.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use wander_core::id::NodeId;
use wander_core::simulation::Simulation;
use wander_core::snapshot::Snapshot;
use wander_core::test_utils::*;
use wander_core::walker::StepKind;
use wander_data::presets;
use wander_data::schema::ScenarioFile;
use wander_stats::{StatsConfig, WalkStats, run_ensemble};

/// Ticks per run; shorter than the presets' own lengths to keep tests quick.
const TICKS: u64 = 200;

fn run(scenario: &ScenarioFile) -> (Simulation, WalkStats) {
    let mut sim = Simulation::new(scenario.config.clone()).unwrap();
    let mut stats = WalkStats::new(StatsConfig::default());
    sim.run_with(TICKS, &mut stats).unwrap();
    (sim, stats)
}

#[test]
fn every_preset_keeps_invariants() {
    for scenario in presets::all() {
        let mut sim = Simulation::new(scenario.config.clone()).unwrap();
        for _ in 0..TICKS {
            sim.step().unwrap();
            assert_graph_invariants(sim.graph());
            let snapshot = sim.snapshot();
            assert_snapshot_invariants(&snapshot, scenario.config.max_degree);
            assert!(snapshot.walker.path.len() <= presets::PRESET_PATH_CAPACITY);
        }
    }
}

/// Nodes within `hops` edges of `from` in a snapshot, excluding `from`.
fn nearby(snapshot: &Snapshot, from: NodeId, hops: u32) -> BTreeSet<NodeId> {
    let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for e in &snapshot.edges {
        adjacency.entry(e.a).or_default().push(e.b);
        adjacency.entry(e.b).or_default().push(e.a);
    }
    let mut depth = BTreeMap::from([(from, 0u32)]);
    let mut queue = VecDeque::from([from]);
    while let Some(node) = queue.pop_front() {
        let d = depth[&node];
        if d == hops {
            continue;
        }
        for &next in adjacency.get(&node).into_iter().flatten() {
            if !depth.contains_key(&next) {
                depth.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    depth.remove(&from);
    depth.into_keys().collect()
}

#[test]
fn social_jumps_stay_within_two_hops() {
    let scenario = presets::social();
    let limit = scenario.config.max_teleport_distance.unwrap();
    let mut sim = Simulation::new(scenario.config.clone()).unwrap();
    let mut jumps = 0;

    for _ in 0..600 {
        let report = sim.step().unwrap();
        if report.step.kind != StepKind::Jumped {
            continue;
        }
        // Presets never remove anything, so the post-tick graph is the one
        // the jump was taken on.
        let reachable = nearby(&sim.snapshot(), report.step.from, limit);
        if !reachable.is_empty() {
            jumps += 1;
            assert!(
                reachable.contains(&report.step.to),
                "tick {}: jump {} -> {} beyond {limit} hops",
                report.tick,
                report.step.from,
                report.step.to
            );
        }
    }
    assert!(jumps > 20, "only {jumps} limited jumps");
}

#[test]
fn stats_agree_with_the_graph() {
    for scenario in presets::all() {
        let (sim, stats) = run(&scenario);
        let name = &scenario.name;

        assert_eq!(stats.ticks_observed(), TICKS, "{name}");
        assert_eq!(stats.visit_counts().values().sum::<u64>(), TICKS, "{name}");
        assert!(stats.coverage() <= sim.graph().node_count(), "{name}");

        let changes = stats.changes();
        assert_eq!(changes.nodes_removed, 0, "{name}");
        assert_eq!(
            sim.graph().node_count() as u64,
            scenario.config.initial_node_count as u64 + changes.nodes_added,
            "{name}"
        );
        assert_eq!(
            sim.graph().edge_count() as u64,
            changes.edges_added,
            "{name}"
        );
        assert_eq!(
            stats.edge_count_history().latest(),
            Some(sim.graph().edge_count() as f64),
            "{name}"
        );
    }
}

#[test]
fn jump_and_stay_rates_follow_the_config() {
    // Over many steps the observed rates approach the configured ones. Dead
    // ends add forced teleports, so the teleport rate is only bounded below.
    let scenario = presets::stochastic();
    let mut sim = Simulation::new(scenario.config.clone()).unwrap();
    let mut stats = WalkStats::new(StatsConfig::default());
    sim.run_with(4000, &mut stats).unwrap();

    let stay = stats.stay_rate();
    assert!((stay - scenario.config.stay_probability).abs() < 0.03, "stay {stay}");
    assert!(stats.teleport_rate() > scenario.config.teleport_probability - 0.03);
}

#[test]
fn presets_are_reproducible() {
    for scenario in presets::all() {
        let (a, stats_a) = run(&scenario);
        let (b, stats_b) = run(&scenario);
        assert_eq!(a.state_hash(), b.state_hash(), "{}", scenario.name);
        assert_eq!(stats_a.visit_counts(), stats_b.visit_counts());
    }
}

#[test]
fn ensemble_matches_individual_runs() {
    let scenario = presets::internet();
    let seeds = [11, 22, 33];
    let summaries = run_ensemble(&scenario.config, &seeds, 50).unwrap();

    for (summary, &seed) in summaries.iter().zip(&seeds) {
        let mut config = scenario.config.clone();
        config.random_seed = seed;
        let mut sim = Simulation::new(config).unwrap();
        sim.run(50).unwrap();
        assert_eq!(summary.state_hash, sim.state_hash());
        assert_eq!(summary.node_count, sim.graph().node_count());
    }
}
