//! Built-in scenarios.
//!
//! Each preset models a kind of network and a walker suited to it. All of
//! them bound the walker's path to the last [`PRESET_PATH_CAPACITY`] nodes so
//! that long runs do not copy an ever-growing path into every snapshot.

use crate::schema::ScenarioFile;
use wander_core::config::SimConfig;
use wander_core::evolution::GrowthStrategy;

/// Names accepted by [`preset`], in display order.
pub const PRESET_NAMES: [&str; 4] = ["basic", "internet", "social", "stochastic"];

/// Path history kept by every preset walker.
pub const PRESET_PATH_CAPACITY: usize = 100;

/// Look up a preset by name.
pub fn preset(name: &str) -> Option<ScenarioFile> {
    match name {
        "basic" => Some(basic()),
        "internet" => Some(internet()),
        "social" => Some(social()),
        "stochastic" => Some(stochastic()),
        _ => None,
    }
}

/// Every preset, in [`PRESET_NAMES`] order.
pub fn all() -> Vec<ScenarioFile> {
    PRESET_NAMES.iter().filter_map(|name| preset(name)).collect()
}

/// A small randomly growing graph with an edge-weighted walker.
pub fn basic() -> ScenarioFile {
    ScenarioFile::new(
        "basic",
        100,
        SimConfig {
            growth_strategy: GrowthStrategy::Random,
            initial_node_count: 5,
            node_add_probability: 0.3,
            edge_add_probability: 0.4,
            edge_weight_range: (1.0, 5.0),
            teleport_probability: 0.1,
            path_capacity: Some(PRESET_PATH_CAPACITY),
            ..SimConfig::default()
        },
    )
    .with_description("random growth with an edge-weighted walker")
}

/// Scale-free growth explored by a degree-seeking crawler.
pub fn internet() -> ScenarioFile {
    ScenarioFile::new(
        "internet",
        800,
        SimConfig {
            growth_strategy: GrowthStrategy::PreferentialAttachment,
            initial_node_count: 30,
            max_degree: 10,
            attachment_count: 2,
            node_add_probability: 0.1,
            triadic_probability: 0.4,
            degree_exponent: 1.1,
            teleport_probability: 0.1,
            stay_probability: 0.05,
            max_teleport_distance: Some(2),
            memory_decay: 0.9,
            path_capacity: Some(PRESET_PATH_CAPACITY),
            ..SimConfig::default()
        },
    )
    .with_description("preferential attachment crawled by a degree-biased walker")
}

/// Aging growth with an activity-driven walker.
pub fn social() -> ScenarioFile {
    ScenarioFile::new(
        "social",
        800,
        SimConfig {
            growth_strategy: GrowthStrategy::Aging,
            initial_node_count: 40,
            max_degree: 15,
            attachment_count: 3,
            node_add_probability: 0.1,
            triadic_probability: 0.6,
            aging_exponent: 1.0,
            activity_exponent: 1.0,
            activity_decay: 0.9,
            teleport_probability: 0.2,
            stay_probability: 0.05,
            max_teleport_distance: Some(2),
            memory_decay: 0.85,
            path_capacity: Some(PRESET_PATH_CAPACITY),
            ..SimConfig::default()
        },
    )
    .with_description("aging attachment with an activity-biased walker")
}

/// Random connectivity with wide edge weights and a restless navigator.
pub fn stochastic() -> ScenarioFile {
    ScenarioFile::new(
        "stochastic",
        800,
        SimConfig {
            growth_strategy: GrowthStrategy::Random,
            initial_node_count: 30,
            max_degree: 8,
            node_add_probability: 0.02,
            edge_add_probability: 0.4,
            triadic_probability: 0.3,
            edge_weight_range: (1.0, 10.0),
            teleport_probability: 0.1,
            stay_probability: 0.1,
            max_teleport_distance: Some(1),
            path_capacity: Some(PRESET_PATH_CAPACITY),
            ..SimConfig::default()
        },
    )
    .with_description("random growth with weighted edges, jumps and stays")
}
