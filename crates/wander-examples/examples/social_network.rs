//! Social network example: aging attachment and an activity-driven walker.
//!
//! Newcomers connect to popular but young members, and the walker prefers
//! recently active people. A moderator removes the busiest member halfway
//! through, forcing the walker to relocate if it was standing there.
//!
//! Run with: `cargo run -p wander-examples --example social_network`

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wander_core::command::AppliedMutation;
use wander_core::simulation::Simulation;
use wander_data::presets;
use wander_stats::{StatsConfig, WalkStats};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let scenario = presets::social();
    let half = scenario.ticks / 2;
    let mut sim = Simulation::new(scenario.config)?;
    let mut stats = WalkStats::new(StatsConfig::default());

    sim.run_with(half, &mut stats)?;

    if let Some((busiest, visits)) = stats.most_visited()
        && sim.graph().contains_node(busiest)
    {
        info!(%busiest, visits, "moderator removes the busiest member");
        sim.queue_remove_node(busiest)?;
    }
    let report = sim.step_with(&mut stats)?;
    for applied in &report.applied {
        if let AppliedMutation::NodeRemoved {
            node,
            edges_removed,
            relocated_to,
        } = applied
        {
            info!(%node, edges_removed, ?relocated_to, "member removed");
        }
    }

    sim.run_with(scenario.ticks - half - 1, &mut stats)?;

    let mut active: Vec<_> = sim.graph().nodes().map(|(id, n)| (id, n.activity)).collect();
    active.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    println!("most active members:");
    for (node, activity) in active.iter().take(5) {
        println!("  {node}  activity {activity:.3}");
    }

    let walker = sim.walker();
    println!("\nwalker at {} remembers:", walker.position());
    for (node, weight) in walker.memory().iter() {
        println!("  {node}  {weight:.3}");
    }

    let components = sim.snapshot().component_count();
    if components > 1 {
        warn!(components, "community is fragmented");
    }
    info!(
        coverage = stats.coverage(),
        stay_rate = stats.stay_rate(),
        teleport_rate = stats.teleport_rate(),
        "done"
    );
    Ok(())
}
