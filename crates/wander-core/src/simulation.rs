//! The simulation driver: owns the graph, the walker and the clock, and runs
//! the tick pipeline.
//!
//! # Tick pipeline
//!
//! Each tick runs, in order:
//! 1. **Clock** -- advance the tick counter and stamp the graph store.
//! 2. **Pre-tick** -- apply queued external mutations, moving the walker off
//!    any node that is about to disappear.
//! 3. **Evolve** -- the growth rule performs at most one structural batch.
//! 4. **Decay** -- every node's activity is multiplied by `activity_decay`.
//! 5. **Walk** -- the walker takes exactly one step.
//! 6. **Bookkeeping** -- state hash and snapshot.
//! 7. **Deliver** -- the snapshot goes to every sink; stop requests are
//!    honoured once the tick is complete.
//!
//! # Lifecycle
//!
//! `Idle → Running → (Paused ⇄ Running) → Stopped`. [`Simulation::step`]
//! runs one tick from any non-terminal status without changing it;
//! [`Simulation::run`] only advances while `Running`.

use crate::command::{AppliedMutation, ExternalMutation, MutationQueue};
use crate::config::{ConfigError, SimConfig};
use crate::evolution::{Evolution, Mutation};
use crate::graph::{GraphError, GraphRef, WalkGraph, ordered};
use crate::id::NodeId;
use crate::memory::WalkerMemory;
use crate::rng::SimRng;
use crate::sim::{Lifecycle, SimState, SimStatus, Ticks};
use crate::sink::{SinkControl, SnapshotSink};
use crate::snapshot::Snapshot;
use crate::walk::{WalkPolicy, teleport_target};
use crate::walker::{StepRecord, Walker};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("simulation is stopped")]
    Stopped,
    #[error("cannot {action} a {from} simulation")]
    InvalidTransition { from: SimStatus, action: Lifecycle },
    #[error("cannot remove {0}: it is the last node in the graph")]
    LastNode(NodeId),
}

// ---------------------------------------------------------------------------
// Stop handle
// ---------------------------------------------------------------------------

/// Cloneable handle that requests a cooperative stop. The driver checks it
/// between ticks, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Summary of one completed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: Ticks,
    pub mutation: Mutation,
    pub applied: Vec<AppliedMutation>,
    pub step: StepRecord,
    pub state_hash: u64,
}

/// Observer used when the caller supplies none.
struct NoSink;

impl SnapshotSink for NoSink {
    fn accept(&mut self, _snapshot: &Arc<Snapshot>) -> SinkControl {
        SinkControl::Continue
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A single walker on an evolving graph.
pub struct Simulation {
    config: SimConfig,
    graph: WalkGraph,
    walker: Walker,
    evolution: Evolution,
    policy: WalkPolicy,
    rng: SimRng,
    state: SimState,
    queue: MutationQueue,
    sinks: Vec<Box<dyn SnapshotSink + Send>>,
    stop: StopHandle,
    last_snapshot: Arc<Snapshot>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.state.tick)
            .field("status", &self.state.status)
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("walker", &self.walker.position())
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Validate `config`, seed the graph and place the walker.
    ///
    /// The graph starts with `initial_node_count` disconnected nodes created
    /// at tick 0. The walker starts on `start_node` if set, otherwise on a
    /// seeded node drawn with the simulation RNG.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut graph = WalkGraph::new();
        for _ in 0..config.initial_node_count {
            graph.add_node();
        }

        let mut rng = SimRng::new(config.random_seed);
        let start = match config.start_node {
            Some(index) => NodeId(index),
            None => NodeId(rng.below(config.initial_node_count as usize) as u64),
        };

        let memory = WalkerMemory::new(config.memory_decay, config.memory_eviction_threshold);
        let walker = Walker::new(start, config.path_capacity, memory);
        let last_snapshot = Arc::new(Snapshot::capture(
            &mut graph,
            &walker,
            Mutation::None,
            Vec::new(),
            rng.state(),
        ));

        info!(
            seed = config.random_seed,
            nodes = config.initial_node_count,
            strategy = ?config.growth_strategy,
            %start,
            "simulation created"
        );

        Ok(Self {
            evolution: Evolution::from_config(&config),
            policy: WalkPolicy::from_config(&config),
            config,
            graph,
            walker,
            rng,
            state: SimState::new(),
            queue: MutationQueue::new(),
            sinks: Vec::new(),
            stop: StopHandle::default(),
            last_snapshot,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn graph(&self) -> &WalkGraph {
        &self.graph
    }

    pub fn walker(&self) -> &Walker {
        &self.walker
    }

    pub fn tick(&self) -> Ticks {
        self.state.tick
    }

    pub fn status(&self) -> SimStatus {
        self.state.status
    }

    pub fn state_hash(&self) -> u64 {
        self.last_snapshot.state_hash
    }

    /// The snapshot taken after the most recent tick (tick 0 before any).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.last_snapshot)
    }

    /// Current move probabilities of the walker. Empty at a dead end.
    pub fn transition_distribution(&self) -> Result<Vec<(NodeId, f64)>, SimError> {
        Ok(self.policy.transition_distribution(&self.graph, &self.walker)?)
    }

    /// A handle that stops this simulation between ticks. Safe to move to
    /// another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Register a sink that receives every subsequent snapshot.
    pub fn add_sink(&mut self, sink: Box<dyn SnapshotSink + Send>) {
        self.sinks.push(sink);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn start(&mut self) -> Result<(), SimError> {
        self.transition(Lifecycle::Start)
    }

    pub fn pause(&mut self) -> Result<(), SimError> {
        self.transition(Lifecycle::Pause)
    }

    pub fn resume(&mut self) -> Result<(), SimError> {
        self.transition(Lifecycle::Resume)
    }

    pub fn stop(&mut self) -> Result<(), SimError> {
        self.transition(Lifecycle::Stop)
    }

    fn transition(&mut self, action: Lifecycle) -> Result<(), SimError> {
        let from = self.state.status;
        let to = from
            .apply(action)
            .ok_or(SimError::InvalidTransition { from, action })?;
        self.state.status = to;
        info!(tick = self.state.tick, %from, %to, "simulation {action}");
        Ok(())
    }

    /// Turn a pending stop request into the `Stopped` status.
    fn poll_stop(&mut self) {
        if self.stop.is_stop_requested() && self.state.status.accepts_ticks() {
            // Every non-terminal status accepts Stop.
            let _ = self.transition(Lifecycle::Stop);
        }
    }

    // -----------------------------------------------------------------------
    // External mutations
    // -----------------------------------------------------------------------

    fn require_live(&self) -> Result<(), SimError> {
        if self.state.status.accepts_ticks() {
            Ok(())
        } else {
            Err(SimError::Stopped)
        }
    }

    /// Queue removal of `node` for the next tick.
    pub fn queue_remove_node(&mut self, node: NodeId) -> Result<(), SimError> {
        self.require_live()?;
        if !self.graph.contains_node(node) {
            return Err(GraphError::InvalidReference(GraphRef::Node(node)).into());
        }
        if self.graph.node_count() == 1 {
            return Err(SimError::LastNode(node));
        }
        self.queue.push(ExternalMutation::RemoveNode { node });
        Ok(())
    }

    /// Queue removal of the edge between `a` and `b` for the next tick.
    pub fn queue_remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<(), SimError> {
        self.require_live()?;
        if !self.graph.has_edge(a, b) {
            return Err(GraphError::InvalidReference(GraphRef::Edge(a, b)).into());
        }
        self.queue.push(ExternalMutation::RemoveEdge { a, b });
        Ok(())
    }

    /// Queue a new edge between `a` and `b` for the next tick.
    pub fn queue_connect(&mut self, a: NodeId, b: NodeId, weight: f64) -> Result<(), SimError> {
        self.require_live()?;
        self.graph.check_edge(a, b, weight)?;
        self.queue.push(ExternalMutation::Connect { a, b, weight });
        Ok(())
    }

    /// Mutations waiting for the next tick.
    pub fn pending_mutations(&self) -> &[ExternalMutation] {
        self.queue.pending()
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Run exactly one tick. The lifecycle status is left unchanged unless a
    /// sink requests a stop.
    pub fn step(&mut self) -> Result<TickReport, SimError> {
        self.step_with(&mut NoSink)
    }

    /// Like [`step`](Self::step), additionally delivering the snapshot to
    /// `sink`.
    pub fn step_with<S: SnapshotSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<TickReport, SimError> {
        self.poll_stop();
        self.require_live()?;
        self.tick_internal(sink)
    }

    /// Run up to `ticks` ticks.
    ///
    /// From `Idle` the simulation is started first. From `Paused` nothing
    /// runs. The loop ends early when a sink, a [`StopHandle`] or `stop()`
    /// stops the simulation.
    pub fn run(&mut self, ticks: u64) -> Result<Vec<TickReport>, SimError> {
        self.run_with(ticks, &mut NoSink)
    }

    /// Like [`run`](Self::run), additionally delivering every snapshot to
    /// `sink`.
    pub fn run_with<S: SnapshotSink + ?Sized>(
        &mut self,
        ticks: u64,
        sink: &mut S,
    ) -> Result<Vec<TickReport>, SimError> {
        self.poll_stop();
        match self.state.status {
            SimStatus::Stopped => return Err(SimError::Stopped),
            SimStatus::Idle => self.start()?,
            SimStatus::Paused | SimStatus::Running => {}
        }

        let mut reports = Vec::new();
        for _ in 0..ticks {
            self.poll_stop();
            if self.state.status != SimStatus::Running {
                break;
            }
            reports.push(self.tick_internal(sink)?);
        }
        Ok(reports)
    }

    // -----------------------------------------------------------------------
    // Internal: single tick
    // -----------------------------------------------------------------------

    fn tick_internal<S: SnapshotSink + ?Sized>(
        &mut self,
        observer: &mut S,
    ) -> Result<TickReport, SimError> {
        // Phase 1: clock.
        self.state.tick += 1;
        let tick = self.state.tick;
        self.graph.set_clock(tick);

        // Phase 2: pre-tick.
        let applied = self.phase_pre_tick(tick)?;

        // Phase 3: evolve.
        let mutation = self.evolution.apply(&mut self.graph, &mut self.rng)?;

        // Phase 4: activity decay.
        self.graph.decay_activity(self.config.activity_decay);

        // Phase 5: walk.
        let step = self
            .policy
            .step(&mut self.graph, &mut self.walker, &mut self.rng)?;

        // Phase 6: bookkeeping.
        let snapshot = Arc::new(Snapshot::capture(
            &mut self.graph,
            &self.walker,
            mutation.clone(),
            applied.clone(),
            self.rng.state(),
        ));
        let state_hash = snapshot.state_hash;
        self.last_snapshot = Arc::clone(&snapshot);

        debug!(
            tick,
            ?mutation,
            position = %step.to,
            kind = ?step.kind,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "tick complete"
        );

        // Phase 7: deliver. Every sink sees the snapshot even if an earlier
        // one asked to stop.
        let mut control = observer.accept(&snapshot);
        for sink in &mut self.sinks {
            if sink.accept(&snapshot) == SinkControl::Stop {
                control = SinkControl::Stop;
            }
        }
        if control == SinkControl::Stop {
            info!(tick, "sink requested stop");
            self.transition(Lifecycle::Stop)?;
        }

        Ok(TickReport {
            tick,
            mutation,
            applied,
            step,
            state_hash,
        })
    }

    fn phase_pre_tick(&mut self, tick: Ticks) -> Result<Vec<AppliedMutation>, SimError> {
        let mut applied = Vec::new();
        for mutation in self.queue.drain() {
            match mutation {
                ExternalMutation::RemoveNode { node } => {
                    if !self.graph.contains_node(node) {
                        warn!(tick, %node, "skipping stale removal: node no longer exists");
                        continue;
                    }
                    if self.graph.node_count() == 1 {
                        warn!(tick, %node, "skipping removal of the last node");
                        continue;
                    }
                    let relocated_to = if self.walker.position() == node {
                        let target = teleport_target(&mut self.graph, node, &mut self.rng)?;
                        self.walker.relocate(target);
                        Some(target)
                    } else {
                        None
                    };
                    let edges_removed = self.graph.degree(node)?;
                    self.graph.remove_node(node)?;
                    self.walker.forget(node);
                    applied.push(AppliedMutation::NodeRemoved {
                        node,
                        edges_removed,
                        relocated_to,
                    });
                }
                ExternalMutation::RemoveEdge { a, b } => match self.graph.remove_edge(a, b) {
                    Ok(edge) => applied.push(AppliedMutation::EdgeRemoved {
                        a: edge.a,
                        b: edge.b,
                    }),
                    Err(err) => warn!(tick, %err, "skipping stale edge removal"),
                },
                ExternalMutation::Connect { a, b, weight } => {
                    match self.graph.add_edge(a, b, weight) {
                        Ok(_) => {
                            let (a, b) = ordered(a, b);
                            applied.push(AppliedMutation::Connected { a, b });
                        }
                        Err(err) => warn!(tick, %err, "skipping stale connect"),
                    }
                }
            }
        }
        Ok(applied)
    }
}
