//! Stochastic example: random growth, weighted edges, jumps and stays.
//!
//! Streams every snapshot to a frame file, reads it back, then compares a
//! small ensemble of seeds.
//!
//! Run with: `cargo run -p wander-examples --example stochastic`

use std::fs::File;
use std::io::{BufReader, BufWriter};

use tracing::info;
use tracing_subscriber::EnvFilter;
use wander_core::frame::{FrameEncoder, FrameReader};
use wander_core::simulation::Simulation;
use wander_core::walker::StepKind;
use wander_data::presets;
use wander_stats::run_ensemble;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let scenario = presets::stochastic();
    let path = std::env::temp_dir().join("wander_stochastic.frames");

    let mut sim = Simulation::new(scenario.config.clone())?;
    let mut encoder = FrameEncoder::new(BufWriter::new(File::create(&path)?));
    sim.run_with(scenario.ticks, &mut encoder)?;
    if let Some(err) = encoder.error() {
        return Err(format!("frame stream failed: {err}").into());
    }
    info!(frames = encoder.frames_written(), path = %path.display(), "frames written");
    encoder.into_inner().into_inner()?;

    let mut stays = 0;
    let mut jumps = 0;
    let mut last_tick = 0;
    for snapshot in FrameReader::new(BufReader::new(File::open(&path)?)) {
        let snapshot = snapshot?;
        match snapshot.walker.step_kind {
            Some(StepKind::Stayed) => stays += 1,
            Some(StepKind::Jumped) => jumps += 1,
            _ => {}
        }
        last_tick = snapshot.tick;
    }
    info!(last_tick, stays, jumps, "frames replayed");

    let seeds: Vec<u64> = (1..=8).collect();
    println!("seed  nodes  edges  comps  maxdeg  coverage  teleport");
    for run in run_ensemble(&scenario.config, &seeds, scenario.ticks)? {
        println!(
            "{:>4}  {:>5}  {:>5}  {:>5}  {:>6}  {:>8}  {:>8.3}",
            run.seed,
            run.node_count,
            run.edge_count,
            run.component_count,
            run.max_degree,
            run.coverage,
            run.teleport_rate
        );
    }
    Ok(())
}
