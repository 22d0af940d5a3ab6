//! Configuration file loading

use super::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/onion-keeper/config.toml";

/// Load, parse and validate config from path
pub fn load_from_path(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse(&contents)
        .with_context(|| format!("Failed to load config file: {}", path.display()))?;

    Ok(config)
}

/// Parse and validate config text
pub fn parse(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).context("Invalid TOML")?;
    super::validate(&config)?;
    Ok(config)
}
