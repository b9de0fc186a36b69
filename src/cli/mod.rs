pub mod completions;
pub mod config;
pub mod submit;

use anyhow::{anyhow, Result};
use std::path::Path;

use rsubmit::config::Config;

/// Loads the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.map_err(|e| anyhow!("{}: {}", e.kind(), e))
}
