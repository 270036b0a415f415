//! Internet example: scale-free growth explored by a degree-seeking crawler.
//!
//! Preferential attachment builds hubs; the crawler's positive degree
//! exponent pulls it toward them. Prints the final degree histogram and the
//! crawler's favourite pages.
//!
//! Run with: `cargo run -p wander-examples --example internet`

use tracing::info;
use tracing_subscriber::EnvFilter;
use wander_core::simulation::Simulation;
use wander_data::presets;
use wander_stats::{StatsConfig, WalkStats, degree_histogram};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let scenario = presets::internet();
    let mut sim = Simulation::new(scenario.config)?;
    let mut stats = WalkStats::new(StatsConfig::default());
    sim.run_with(scenario.ticks, &mut stats)?;

    let snapshot = sim.snapshot();
    info!(
        tick = snapshot.tick,
        nodes = snapshot.node_count(),
        edges = snapshot.edge_count(),
        components = snapshot.component_count(),
        "network grown"
    );

    println!("degree  nodes");
    for (degree, count) in degree_histogram(&snapshot).iter().enumerate() {
        if *count > 0 {
            println!("{degree:>6}  {count}");
        }
    }

    let mut ranked: Vec<_> = stats.visit_distribution();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    println!("\nmost crawled:");
    for (node, share) in ranked.iter().take(5) {
        let degree = snapshot.node(*node).map_or(0, |n| n.degree);
        println!("  {node}  degree {degree:>2}  {:.1}% of visits", share * 100.0);
    }

    info!(teleport_rate = stats.teleport_rate(), "crawl finished");
    Ok(())
}
