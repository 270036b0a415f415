//! Simulation configuration.
//!
//! A [`SimConfig`] is applied once at construction and is immutable for the
//! rest of the run. Every field has a default, so partial config files
//! deserialize cleanly. [`SimConfig::validate`] is the single gate: a config
//! that passes it can never make a tick fail.

use crate::evolution::GrowthStrategy;
use serde::{Deserialize, Serialize};

/// Errors raised while validating a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A numeric parameter is outside its valid range.
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// Parameters are individually valid but contradict each other.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Full parameter set for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Growth rule applied once per tick.
    pub growth_strategy: GrowthStrategy,
    /// Attachment eligibility cap: nodes at this degree receive no new edges.
    pub max_degree: u32,
    /// Edges a new node tries to create (clamped to `max_degree`).
    pub attachment_count: u32,
    /// Per-tick probability of adding a node.
    pub node_add_probability: f64,
    /// Per-tick probability of adding a single edge (random growth only).
    pub edge_add_probability: f64,
    /// Per-tick probability of closing a triangle over a random edge when no
    /// other growth happened.
    pub triadic_probability: f64,
    /// New edge weights are drawn uniformly from `[min, max)`; a degenerate
    /// range gives every edge exactly `min`.
    pub edge_weight_range: (f64, f64),
    /// Exponent on `(age + 1)` in aging-based attachment.
    pub aging_exponent: f64,
    /// Exponent on the normalized degree of a walk candidate. May be negative.
    pub degree_exponent: f64,
    /// Exponent on the activity of a walk candidate.
    pub activity_exponent: f64,
    /// Per-tick multiplicative decay of node activity.
    pub activity_decay: f64,
    /// Activity added to a node each time the walker visits it.
    pub activity_increment: f64,
    /// Per-step multiplicative decay of walker memory weights.
    pub memory_decay: f64,
    /// Score multiplier for a node visited on the previous step. Below 1
    /// repels the walker from recent nodes, above 1 attracts it.
    pub memory_penalty: f64,
    /// Memory entries whose weight drops below this are evicted.
    pub memory_eviction_threshold: f64,
    /// Per-step probability of a voluntary jump.
    pub teleport_probability: f64,
    /// Per-step probability of staying in place.
    pub stay_probability: f64,
    /// Hop limit for voluntary jumps. `None` lets a jump land anywhere.
    /// Dead-end teleports ignore it.
    pub max_teleport_distance: Option<u32>,
    /// Maximum path history length. `None` keeps the whole path, which every
    /// snapshot then copies; long runs should set a bound.
    pub path_capacity: Option<usize>,
    /// Index of the seeded node the walker starts on. `None` draws one.
    pub start_node: Option<u64>,
    /// Seed of the SplitMix64 generator shared by all phases.
    pub random_seed: u64,
    /// Disconnected nodes present at tick 0.
    pub initial_node_count: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            growth_strategy: GrowthStrategy::Random,
            max_degree: 15,
            attachment_count: 2,
            node_add_probability: 0.3,
            edge_add_probability: 0.4,
            triadic_probability: 0.0,
            edge_weight_range: (1.0, 1.0),
            aging_exponent: 1.0,
            degree_exponent: 0.0,
            activity_exponent: 0.0,
            activity_decay: 0.9,
            activity_increment: 1.0,
            memory_decay: 0.9,
            memory_penalty: 0.5,
            memory_eviction_threshold: 0.05,
            teleport_probability: 0.0,
            stay_probability: 0.0,
            max_teleport_distance: None,
            path_capacity: None,
            start_node: None,
            random_seed: 42,
            initial_node_count: 5,
        }
    }
}

fn out_of_range(field: &'static str, value: f64, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value,
        expected,
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(field, value, "[0, 1]"))
    }
}

fn open_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "(0, 1)"))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "finite and >= 0"))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "finite and > 0"))
    }
}

impl SimConfig {
    /// Check every parameter. Called by the driver before any tick runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_degree == 0 {
            return Err(out_of_range("max_degree", 0.0, ">= 1"));
        }
        if self.attachment_count == 0 {
            return Err(out_of_range("attachment_count", 0.0, ">= 1"));
        }
        if self.initial_node_count == 0 {
            return Err(out_of_range("initial_node_count", 0.0, ">= 1"));
        }

        probability("node_add_probability", self.node_add_probability)?;
        probability("edge_add_probability", self.edge_add_probability)?;
        probability("triadic_probability", self.triadic_probability)?;
        probability("teleport_probability", self.teleport_probability)?;
        probability("stay_probability", self.stay_probability)?;
        if self.teleport_probability + self.stay_probability > 1.0 {
            return Err(ConfigError::Inconsistent(format!(
                "teleport_probability + stay_probability = {} exceeds 1",
                self.teleport_probability + self.stay_probability
            )));
        }

        let (lo, hi) = self.edge_weight_range;
        positive("edge_weight_range.0", lo)?;
        positive("edge_weight_range.1", hi)?;
        if lo > hi {
            return Err(ConfigError::Inconsistent(format!(
                "edge_weight_range min {lo} exceeds max {hi}"
            )));
        }

        non_negative("aging_exponent", self.aging_exponent)?;
        if !self.degree_exponent.is_finite() {
            return Err(out_of_range("degree_exponent", self.degree_exponent, "finite"));
        }
        non_negative("activity_exponent", self.activity_exponent)?;
        open_unit("activity_decay", self.activity_decay)?;
        positive("activity_increment", self.activity_increment)?;

        open_unit("memory_decay", self.memory_decay)?;
        non_negative("memory_penalty", self.memory_penalty)?;
        open_unit("memory_eviction_threshold", self.memory_eviction_threshold)?;

        if self.max_teleport_distance == Some(0) {
            return Err(out_of_range("max_teleport_distance", 0.0, ">= 1"));
        }
        if self.path_capacity == Some(0) {
            return Err(out_of_range("path_capacity", 0.0, ">= 1"));
        }
        if let Some(start) = self.start_node
            && start >= u64::from(self.initial_node_count)
        {
            return Err(ConfigError::Inconsistent(format!(
                "start_node {start} is not one of the {} seeded nodes",
                self.initial_node_count
            )));
        }

        Ok(())
    }

    /// Number of edges a new node tries to create.
    pub fn effective_attachment_count(&self) -> usize {
        self.attachment_count.min(self.max_degree) as usize
    }
}
