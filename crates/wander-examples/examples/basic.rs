//! Basic example: a small random graph and an edge-weighted walker.
//!
//! Runs the `basic` scenario, or a scenario file given as the first
//! argument, and logs the walker's progress every ten ticks.
//!
//! Run with: `cargo run -p wander-examples --example basic [scenario.ron]`

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;
use wander_core::simulation::Simulation;
use wander_data::{load_scenario, presets};
use wander_stats::{StatsConfig, WalkStats};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let scenario = match std::env::args().nth(1) {
        Some(path) => load_scenario(Path::new(&path))?,
        None => presets::basic(),
    };
    info!(name = %scenario.name, ticks = scenario.ticks, "running scenario");

    let mut sim = Simulation::new(scenario.config)?;
    let mut stats = WalkStats::new(StatsConfig::default());
    sim.start()?;

    for _ in 0..scenario.ticks {
        let report = sim.step_with(&mut stats)?;
        if report.tick % 10 == 0 {
            info!(
                tick = report.tick,
                position = %report.step.to,
                kind = ?report.step.kind,
                nodes = sim.graph().node_count(),
                edges = sim.graph().edge_count(),
                "progress"
            );
        }
    }

    let changes = stats.changes();
    info!(
        coverage = stats.coverage(),
        teleport_rate = stats.teleport_rate(),
        nodes_added = changes.nodes_added,
        edges_added = changes.edges_added,
        "done"
    );
    if let Some((node, visits)) = stats.most_visited() {
        info!(%node, visits, "most visited node");
    }
    Ok(())
}
