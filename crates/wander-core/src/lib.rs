//! Wander Core -- a biased random walker on an evolving graph.
//!
//! A single walker moves through an undirected graph that grows while it
//! walks. The walker is biased by edge weight, neighbor degree, node
//! activity and a decaying memory of recently visited nodes, and teleports
//! when it reaches a dead end.
//!
//! # Tick Pipeline
//!
//! Each call to [`simulation::Simulation::step`] advances the simulation by
//! one tick:
//!
//! 1. **Clock** -- increment the tick counter and stamp the graph store.
//! 2. **Pre-tick** -- apply queued external mutations (node/edge removal,
//!    connects), relocating the walker off removed nodes.
//! 3. **Evolve** -- the growth strategy adds at most one node or edge batch.
//! 4. **Decay** -- node activity decays.
//! 5. **Walk** -- the walker takes one step.
//! 6. **Bookkeeping** -- compute the state hash and take a snapshot.
//! 7. **Deliver** -- hand the snapshot to every sink.
//!
//! Everything is deterministic: one [`rng::SimRng`] seeded from the config
//! drives every random choice, and all node-keyed state is ordered.
//!
//! # Key Types
//!
//! - [`simulation::Simulation`] -- Driver, lifecycle and tick pipeline.
//! - [`graph::WalkGraph`] -- Undirected graph with degree, activity, age and
//!   lazily cached connected components.
//! - [`evolution::Evolution`] -- Random, preferential and aging growth.
//! - [`walk::WalkPolicy`] -- Transition scoring, jumps, stays and teleports.
//! - [`walker::Walker`] -- Position, bounded path and [`memory::WalkerMemory`].
//! - [`snapshot::Snapshot`] -- Immutable per-tick view for observers.
//! - [`sink::SnapshotSink`] -- Snapshot consumers, including
//!   [`frame::FrameEncoder`] for binary frames.

pub mod command;
pub mod config;
pub mod evolution;
pub mod frame;
pub mod graph;
pub mod id;
pub mod memory;
pub mod rng;
pub mod sim;
pub mod simulation;
pub mod sink;
pub mod snapshot;
pub mod validation;
pub mod walk;
pub mod walker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
