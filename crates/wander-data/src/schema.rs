//! Serde structs for scenario files.
//!
//! A scenario names a configuration and how long to run it. Scenario files
//! are read from RON, JSON or TOML by the loader.

use serde::{Deserialize, Serialize};
use wander_core::config::SimConfig;

fn default_ticks() -> u64 {
    100
}

/// A named, runnable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Number of ticks to run.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Missing fields take their defaults.
    #[serde(default)]
    pub config: SimConfig,
}

impl ScenarioFile {
    pub fn new(name: impl Into<String>, ticks: u64, config: SimConfig) -> Self {
        Self {
            name: name.into(),
            description: None,
            ticks,
            config,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_core::evolution::GrowthStrategy;

    #[test]
    fn minimal_json_uses_defaults() {
        let scenario: ScenarioFile = serde_json::from_str(r#"{ "name": "tiny" }"#).unwrap();
        assert_eq!(scenario.name, "tiny");
        assert_eq!(scenario.ticks, 100);
        assert!(scenario.description.is_none());
        assert_eq!(scenario.config, SimConfig::default());
    }

    #[test]
    fn ron_scenario_parses() {
        let src = r#"(
            name: "aging",
            description: Some("old nodes fade"),
            ticks: 50,
            config: (growth_strategy: aging, max_degree: 6, edge_weight_range: (1.0, 3.0)),
        )"#;
        let scenario: ScenarioFile = ron::from_str(src).unwrap();
        assert_eq!(scenario.ticks, 50);
        assert_eq!(scenario.description.as_deref(), Some("old nodes fade"));
        assert_eq!(scenario.config.growth_strategy, GrowthStrategy::Aging);
        assert_eq!(scenario.config.max_degree, 6);
        assert_eq!(scenario.config.edge_weight_range, (1.0, 3.0));
    }

    #[test]
    fn toml_scenario_parses() {
        let src = r#"
            name = "crawler"
            ticks = 20

            [config]
            growth_strategy = "preferential"
            initial_node_count = 30
            teleport_probability = 0.1
        "#;
        let scenario: ScenarioFile = toml::from_str(src).unwrap();
        assert_eq!(scenario.ticks, 20);
        assert_eq!(
            scenario.config.growth_strategy,
            GrowthStrategy::PreferentialAttachment
        );
        assert_eq!(scenario.config.initial_node_count, 30);
        assert_eq!(scenario.config.max_degree, SimConfig::default().max_degree);
    }
}
