//! CLI command for managing rsubmit configuration.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use rsubmit::config::Config;

use super::load_config;

#[derive(Args)]
#[command(about = "Manage rsubmit configuration")]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with the default settings
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        match &self.action {
            ConfigAction::Show => show_config(config_path),
            ConfigAction::Path => {
                println!("{}", resolve_path(config_path)?.display());
                Ok(())
            }
            ConfigAction::Init { force } => init_config(config_path, *force),
        }
    }
}

fn resolve_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path().ok_or_else(|| {
            anyhow!(
                "Could not determine config directory\n\n\
                 Suggestions:\n\
                 • Check HOME environment variable is set\n\
                 • Pass the file explicitly with --config <path>"
            )
        }),
    }
}

fn show_config(config_path: Option<&Path>) -> Result<()> {
    let path = resolve_path(config_path)?;
    let config = load_config(Some(path.as_path()))?;

    if !path.exists() {
        println!("# No configuration file at {}; showing defaults", path.display());
    }
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn init_config(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve_path(config_path)?;

    if path.exists() && !force {
        return Err(anyhow!(
            "Configuration file already exists: {}\n\nUse --force to overwrite it.",
            path.display()
        ));
    }

    Config::default()
        .save_to(&path)
        .map_err(|e| anyhow!("{}: {}", e.kind(), e))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
