//! Reads configuration and scenario files.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers. Every loaded configuration is validated before
//! it is returned.

use crate::presets;
use crate::schema::ScenarioFile;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;
use wander_core::config::{ConfigError, SimConfig};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The file parsed but describes an invalid configuration.
    #[error("invalid configuration in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Neither a scenario file nor a preset has this name.
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [&str; 3] = ["ron", "toml", "json"];

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in &EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// All files in `dir` with a supported extension, sorted by path.
pub fn discover_scenarios(dir: &Path) -> Result<Vec<PathBuf>, DataLoadError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && detect_format(&path).is_ok() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `file` is only used for error
/// reporting.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Loading
// ===========================================================================

fn validated(config: &SimConfig, file: &Path) -> Result<(), DataLoadError> {
    config.validate().map_err(|source| DataLoadError::Config {
        file: file.to_path_buf(),
        source,
    })
}

/// Load and validate a bare [`SimConfig`] file.
pub fn load_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    let config: SimConfig = deserialize_file(path)?;
    validated(&config, path)?;
    debug!(file = %path.display(), "loaded config");
    Ok(config)
}

/// Load a scenario file and validate its configuration.
pub fn load_scenario(path: &Path) -> Result<ScenarioFile, DataLoadError> {
    let scenario: ScenarioFile = deserialize_file(path)?;
    validated(&scenario.config, path)?;
    debug!(file = %path.display(), name = %scenario.name, ticks = scenario.ticks, "loaded scenario");
    Ok(scenario)
}

/// Resolve a scenario by name: a file `{name}.{ron,toml,json}` in `dir`
/// takes precedence over a built-in preset of the same name.
pub fn resolve_scenario(dir: Option<&Path>, name: &str) -> Result<ScenarioFile, DataLoadError> {
    if let Some(dir) = dir
        && let Some(path) = find_data_file(dir, name)?
    {
        return load_scenario(&path);
    }
    presets::preset(name).ok_or_else(|| DataLoadError::UnknownScenario(name.to_string()))
}

// ===========================================================================
// Tests
// ===========================================================================
