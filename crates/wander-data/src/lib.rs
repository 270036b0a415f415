pub mod loader;
pub mod presets;
pub mod schema;

pub use loader::{DataLoadError, load_config, load_scenario, resolve_scenario};
pub use schema::ScenarioFile;
