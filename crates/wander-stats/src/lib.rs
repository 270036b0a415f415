//! Walk statistics for the Wander simulation.
//!
//! Tracks where the walker goes and how the graph changes over time.
//! [`WalkStats`] is a [`SnapshotSink`]: register it with a simulation, or
//! feed it snapshots by hand, and query visit distributions, coverage,
//! teleport rates, change counters and rolling histories.
//!
//! # Usage
//!
//! ```ignore
//! let mut stats = WalkStats::new(StatsConfig::default());
//! sim.run_with(500, &mut stats)?;
//! let coverage = stats.coverage();
//! let rate = stats.teleport_rate();
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use wander_core::config::SimConfig;
use wander_core::id::NodeId;
use wander_core::sim::Ticks;
use wander_core::simulation::{SimError, Simulation};
use wander_core::sink::{SinkControl, SnapshotSink};
use wander_core::snapshot::Snapshot;
use wander_core::walker::StepKind;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the statistics module.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Ticks of per-tick history retained for each rolling metric.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer -- fixed-capacity history of per-tick values
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer storing `f64` values for trend analysis.
///
/// When full, the oldest entry is overwritten. Iterates oldest-to-newest.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a new ring buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Push a value, overwriting the oldest entry if at capacity.
    pub fn push(&mut self, value: f64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Get the most recently pushed value, if any.
    pub fn latest(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let idx = if self.head == 0 {
            self.capacity() - 1
        } else {
            self.head - 1
        };
        Some(self.data[idx])
    }

    /// Mean of the stored values, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.len as f64)
    }

    /// Iterate values from oldest to newest.
    pub fn iter(&self) -> RingBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        RingBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Collect all stored values into a Vec (oldest to newest).
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over a [`RingBuffer`], oldest to newest.
pub struct RingBufferIter<'a> {
    buffer: &'a RingBuffer,
    index: usize,
    remaining: usize,
}

impl Iterator for RingBufferIter<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.buffer.data[self.index];
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RingBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Snapshot metrics
// ---------------------------------------------------------------------------

/// Number of nodes per degree, indexed by degree.
pub fn degree_histogram(snapshot: &Snapshot) -> Vec<usize> {
    let max = snapshot.nodes.iter().map(|n| n.degree).max().unwrap_or(0);
    let mut histogram = vec![0; max as usize + 1];
    for node in &snapshot.nodes {
        histogram[node.degree as usize] += 1;
    }
    histogram
}

/// Mean node degree, `2 * edges / nodes`. Zero for an empty snapshot.
pub fn mean_degree(snapshot: &Snapshot) -> f64 {
    if snapshot.nodes.is_empty() {
        return 0.0;
    }
    2.0 * snapshot.edge_count() as f64 / snapshot.node_count() as f64
}

// ---------------------------------------------------------------------------
// WalkStats
// ---------------------------------------------------------------------------

/// Cumulative graph change counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounters {
    pub nodes_added: u64,
    pub edges_added: u64,
    pub nodes_removed: u64,
    pub edges_removed: u64,
}

/// Aggregated statistics over a sequence of snapshots.
#[derive(Debug, Clone)]
pub struct WalkStats {
    config: StatsConfig,
    last_tick: Option<Ticks>,
    ticks_observed: u64,
    visits: BTreeMap<NodeId, u64>,
    teleports: u64,
    stays: u64,
    changes: ChangeCounters,
    node_count: RingBuffer,
    edge_count: RingBuffer,
    mean_degree: RingBuffer,
    component_count: RingBuffer,
}

impl WalkStats {
    pub fn new(config: StatsConfig) -> Self {
        let cap = config.history_capacity;
        Self {
            config,
            last_tick: None,
            ticks_observed: 0,
            visits: BTreeMap::new(),
            teleports: 0,
            stays: 0,
            changes: ChangeCounters::default(),
            node_count: RingBuffer::new(cap),
            edge_count: RingBuffer::new(cap),
            mean_degree: RingBuffer::new(cap),
            component_count: RingBuffer::new(cap),
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Fold one snapshot into the statistics.
    ///
    /// A snapshot at or before the last observed tick is ignored, so the
    /// tick-0 snapshot and repeated deliveries are harmless. Only snapshots
    /// after a step count as visits.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        if self.last_tick.is_some_and(|t| snapshot.tick <= t) {
            return;
        }
        self.last_tick = Some(snapshot.tick);

        if let Some(kind) = snapshot.walker.step_kind {
            self.ticks_observed += 1;
            *self.visits.entry(snapshot.walker.position).or_insert(0) += 1;
            if kind.is_teleport() {
                self.teleports += 1;
            }
            if kind == StepKind::Stayed {
                self.stays += 1;
            }
        }

        self.changes.nodes_added += snapshot.mutation.nodes_added() as u64;
        self.changes.edges_added += snapshot.mutation.edges_added() as u64;
        for applied in &snapshot.applied {
            self.changes.nodes_removed += applied.nodes_removed() as u64;
            self.changes.edges_removed += applied.edges_removed() as u64;
            self.changes.edges_added += applied.edges_added() as u64;
        }

        self.node_count.push(snapshot.node_count() as f64);
        self.edge_count.push(snapshot.edge_count() as f64);
        self.mean_degree.push(mean_degree(snapshot));
        self.component_count.push(snapshot.component_count() as f64);
    }

    /// Steps observed so far.
    pub fn ticks_observed(&self) -> u64 {
        self.ticks_observed
    }

    pub fn last_tick(&self) -> Option<Ticks> {
        self.last_tick
    }

    /// Times the walker ended a step on `node`.
    pub fn visit_count(&self, node: NodeId) -> u64 {
        self.visits.get(&node).copied().unwrap_or(0)
    }

    /// Visit counts in ascending node order. Removed nodes keep their counts.
    pub fn visit_counts(&self) -> &BTreeMap<NodeId, u64> {
        &self.visits
    }

    /// Fraction of observed steps that ended on each node. Sums to one when
    /// any step has been observed.
    pub fn visit_distribution(&self) -> Vec<(NodeId, f64)> {
        if self.ticks_observed == 0 {
            return Vec::new();
        }
        let total = self.ticks_observed as f64;
        self.visits
            .iter()
            .map(|(&node, &count)| (node, count as f64 / total))
            .collect()
    }

    /// The most visited node, lowest id first on ties.
    pub fn most_visited(&self) -> Option<(NodeId, u64)> {
        self.visits
            .iter()
            .fold(None, |best: Option<(NodeId, u64)>, (&node, &count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((node, count)),
            })
    }

    /// Distinct nodes the walker has visited.
    pub fn coverage(&self) -> usize {
        self.visits.len()
    }

    /// Fraction of steps that were teleports (forced or voluntary).
    pub fn teleport_rate(&self) -> f64 {
        ratio(self.teleports, self.ticks_observed)
    }

    pub fn teleport_count(&self) -> u64 {
        self.teleports
    }

    /// Fraction of steps where the walker stayed put.
    pub fn stay_rate(&self) -> f64 {
        ratio(self.stays, self.ticks_observed)
    }

    pub fn changes(&self) -> ChangeCounters {
        self.changes
    }

    /// Per-tick node counts, oldest first.
    pub fn node_count_history(&self) -> &RingBuffer {
        &self.node_count
    }

    pub fn edge_count_history(&self) -> &RingBuffer {
        &self.edge_count
    }

    pub fn mean_degree_history(&self) -> &RingBuffer {
        &self.mean_degree
    }

    pub fn component_count_history(&self) -> &RingBuffer {
        &self.component_count
    }

    /// Reset all statistics, keeping the configuration.
    pub fn clear(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl SnapshotSink for WalkStats {
    fn accept(&mut self, snapshot: &Arc<Snapshot>) -> SinkControl {
        self.observe(snapshot);
        SinkControl::Continue
    }
}

// ---------------------------------------------------------------------------
// Ensembles
// ---------------------------------------------------------------------------

/// Outcome of one run in an ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks: u64,
    pub node_count: usize,
    pub edge_count: usize,
    pub component_count: usize,
    pub max_degree: u32,
    pub mean_degree: f64,
    pub coverage: usize,
    pub teleport_rate: f64,
    pub state_hash: u64,
}

fn run_one(config: &SimConfig, seed: u64, ticks: u64) -> Result<RunSummary, SimError> {
    let mut sim = Simulation::new(SimConfig {
        random_seed: seed,
        ..config.clone()
    })?;
    let mut stats = WalkStats::new(StatsConfig { history_capacity: 1 });
    sim.run_with(ticks, &mut stats)?;

    let snapshot = sim.snapshot();
    Ok(RunSummary {
        seed,
        ticks: sim.tick(),
        node_count: snapshot.node_count(),
        edge_count: snapshot.edge_count(),
        component_count: snapshot.component_count(),
        max_degree: snapshot.nodes.iter().map(|n| n.degree).max().unwrap_or(0),
        mean_degree: mean_degree(&snapshot),
        coverage: stats.coverage(),
        teleport_rate: stats.teleport_rate(),
        state_hash: snapshot.state_hash,
    })
}

/// Run one independent simulation per seed, each for `ticks` ticks, and
/// summarize them in seed order. `config.random_seed` is overridden.
///
/// With the `parallel` feature the runs are spread across threads; results
/// are identical either way.
pub fn run_ensemble(
    config: &SimConfig,
    seeds: &[u64],
    ticks: u64,
) -> Result<Vec<RunSummary>, SimError> {
    config.validate()?;
    tracing::debug!(runs = seeds.len(), ticks, "running ensemble");

    #[cfg(feature = "parallel")]
    let runs = {
        use rayon::prelude::*;
        seeds
            .par_iter()
            .map(|&seed| run_one(config, seed, ticks))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let runs = seeds
        .iter()
        .map(|&seed| run_one(config, seed, ticks))
        .collect();

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_core::evolution::GrowthStrategy;
    use wander_core::test_utils::*;

    // -----------------------------------------------------------------------
    // RingBuffer
    // -----------------------------------------------------------------------

    #[test]
    fn ring_buffer_overwrites_oldest() {
        let mut rb = RingBuffer::new(3);
        assert!(rb.is_empty());
        assert_eq!(rb.latest(), None);
        for v in [1.0, 2.0, 3.0, 4.0] {
            rb.push(v);
        }
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(rb.latest(), Some(4.0));
        assert_eq!(rb.mean(), Some(3.0));
    }

    #[test]
    fn ring_buffer_zero_capacity_holds_one() {
        let mut rb = RingBuffer::new(0);
        rb.push(1.0);
        rb.push(2.0);
        assert_eq!(rb.capacity(), 1);
        assert_eq!(rb.to_vec(), vec![2.0]);
    }

    #[test]
    fn ring_buffer_clear() {
        let mut rb = RingBuffer::new(2);
        rb.push(5.0);
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.mean(), None);
        assert_eq!(rb.iter().len(), 0);
    }

    // -----------------------------------------------------------------------
    // Snapshot metrics
    // -----------------------------------------------------------------------

    #[test]
    fn histogram_and_mean_degree() {
        let mut sim = Simulation::new(frozen(4)).unwrap();
        sim.queue_connect(NodeId(0), NodeId(1), 1.0).unwrap();
        sim.queue_connect(NodeId(0), NodeId(2), 1.0).unwrap();
        sim.step().unwrap();
        let snap = sim.snapshot();
        // Degrees: 2, 1, 1, 0.
        assert_eq!(degree_histogram(&snap), vec![1, 2, 1]);
        assert!((mean_degree(&snap) - 1.0).abs() < 1e-12);
    }

    // -----------------------------------------------------------------------
    // WalkStats
    // -----------------------------------------------------------------------

    #[test]
    fn counts_visits_per_step() {
        let mut sim = Simulation::new(busy(GrowthStrategy::Random, 5)).unwrap();
        let mut stats = WalkStats::new(StatsConfig::default());
        stats.observe(&sim.snapshot());
        sim.run_with(40, &mut stats).unwrap();

        assert_eq!(stats.ticks_observed(), 40);
        assert_eq!(stats.visit_counts().values().sum::<u64>(), 40);
        let total: f64 = stats.visit_distribution().iter().map(|&(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(stats.coverage() >= 1);
        let (_, top) = stats.most_visited().unwrap();
        assert!(top >= 1);
    }

    #[test]
    fn repeated_snapshots_are_ignored() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.step().unwrap();
        let snap = sim.snapshot();
        let mut stats = WalkStats::new(StatsConfig::default());
        stats.observe(&snap);
        stats.observe(&snap);
        assert_eq!(stats.ticks_observed(), 1);
        assert_eq!(stats.node_count_history().len(), 1);
    }

    #[test]
    fn isolated_nodes_teleport_every_step() {
        let mut sim = Simulation::new(frozen(3)).unwrap();
        let mut stats = WalkStats::new(StatsConfig::default());
        sim.run_with(10, &mut stats).unwrap();
        assert_eq!(stats.teleport_count(), 10);
        assert_eq!(stats.teleport_rate(), 1.0);
        assert_eq!(stats.stay_rate(), 0.0);
    }

    #[test]
    fn change_counters_track_growth_and_removals() {
        let mut sim = Simulation::new(SimConfig {
            node_add_probability: 1.0,
            ..SimConfig::default()
        })
        .unwrap();
        let mut stats = WalkStats::new(StatsConfig::default());
        sim.run_with(5, &mut stats).unwrap();
        assert_eq!(stats.changes().nodes_added, 5);

        let victim = sim.graph().node_ids().find(|&n| n != sim.walker().position()).unwrap();
        let degree = sim.graph().degree(victim).unwrap() as u64;
        let edges_before = stats.changes().edges_removed;
        sim.queue_remove_node(victim).unwrap();
        sim.run_with(1, &mut stats).unwrap();
        assert_eq!(stats.changes().nodes_removed, 1);
        assert_eq!(stats.changes().edges_removed, edges_before + degree);
    }

    #[test]
    fn history_is_bounded() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let mut stats = WalkStats::new(StatsConfig { history_capacity: 8 });
        sim.run_with(30, &mut stats).unwrap();
        assert_eq!(stats.node_count_history().len(), 8);
        assert_eq!(
            stats.node_count_history().latest(),
            Some(sim.graph().node_count() as f64)
        );
        assert_eq!(
            stats.component_count_history().latest(),
            Some(sim.snapshot().component_count() as f64)
        );
    }

    #[test]
    fn clear_resets_everything() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let mut stats = WalkStats::new(StatsConfig::default());
        sim.run_with(5, &mut stats).unwrap();
        stats.clear();
        assert_eq!(stats.ticks_observed(), 0);
        assert_eq!(stats.last_tick(), None);
        assert!(stats.visit_distribution().is_empty());
        assert_eq!(stats.changes(), ChangeCounters::default());
    }

    // -----------------------------------------------------------------------
    // Ensembles
    // -----------------------------------------------------------------------

    #[test]
    fn ensemble_is_ordered_and_reproducible() {
        let config = busy(GrowthStrategy::PreferentialAttachment, 0);
        let seeds = [3, 1, 4, 1, 5];
        let a = run_ensemble(&config, &seeds, 30).unwrap();
        let b = run_ensemble(&config, &seeds, 30).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.iter().map(|r| r.seed).collect::<Vec<_>>(), seeds);
        assert_eq!(a[1], a[3]);
        assert!(a.iter().all(|r| r.ticks == 30));
    }

    #[test]
    fn ensemble_rejects_invalid_config() {
        let config = SimConfig {
            max_degree: 0,
            ..SimConfig::default()
        };
        assert!(run_ensemble(&config, &[1], 5).is_err());
    }
}
