//! Engine configuration stored as RON.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use ripdash_core::EngineConfig;
use ripdash_logging::{dash_info, dash_warn};

pub(crate) const DEFAULT_CONFIG_FILE: &str = "./ripdash.ron";

/// Loads the engine configuration.
///
/// An explicit path must exist and parse. Without one, the default file is
/// used when present and otherwise the built-in defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    match explicit {
        Some(path) => read_config(path),
        None => Ok(load_default(Path::new(DEFAULT_CONFIG_FILE))),
    }
}

fn read_config(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config =
        parse_config(&content).with_context(|| format!("invalid config {}", path.display()))?;
    dash_info!("Loaded engine config from {:?}", path);
    Ok(config)
}

fn load_default(path: &Path) -> EngineConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return EngineConfig::default(),
        Err(err) => {
            dash_warn!("Failed to read config from {:?}: {}", path, err);
            return EngineConfig::default();
        }
    };

    match parse_config(&content) {
        Ok(config) => {
            dash_info!("Loaded engine config from {:?}", path);
            config
        }
        Err(err) => {
            dash_warn!("Ignoring config {:?}: {:#}", path, err);
            EngineConfig::default()
        }
    }
}

fn parse_config(content: &str) -> Result<EngineConfig> {
    let config: EngineConfig = ron::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Renders `config` the way [`load_config`] reads it back.
pub(crate) fn render_config(config: &EngineConfig) -> Result<String> {
    let pretty = ron::ser::PrettyConfig::new();
    Ok(ron::ser::to_string_pretty(config, pretty)?)
}
