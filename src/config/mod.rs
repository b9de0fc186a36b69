//! Configuration management for rsubmit.
//!
//! Settings that rarely change between invocations (port, polling cadence,
//! the remote command, the submission options) live in a YAML file so the
//! command line only has to carry what differs per job.
//!
//! # Configuration File Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/rsubmit/config.yml`
//! - macOS: `~/Library/Application Support/rsubmit/config.yml`
//! - Windows: `C:\Users\<User>\AppData\Roaming\rsubmit\config.yml`
//!
//! # Example Configuration
//!
//! ```yaml
//! defaults:
//!   port: 22
//!   report_interval_secs: 60
//!   chunk_size: 1000
//!   remote_command: "sas -nodms -stdio"
//!   submission_options:
//!     - "validvarname=any"
//!     - "pagesize=max"
//! hosts:
//!   grid.example.com:
//!     port: 2222
//!     username: "analyst"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Default seconds between progress reports
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 60;

/// Default number of lines fetched per drain call
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default command started on the workspace host; reads the program on stdin
pub const DEFAULT_REMOTE_COMMAND: &str = "sas -nodms -stdio";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultSettings,

    /// Per-host overrides, keyed by workspace host name
    #[serde(default)]
    pub hosts: HashMap<String, HostProfile>,
}

/// Settings applied to every job unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultSettings {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_remote_command")]
    pub remote_command: String,

    /// Options rendered into the preamble of every submission, in order
    #[serde(default = "default_submission_options")]
    pub submission_options: Vec<String>,
}

/// Overrides for a single workspace host.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HostProfile {
    pub port: Option<u16>,
    pub username: Option<String>,
    pub remote_command: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_report_interval() -> u64 {
    DEFAULT_REPORT_INTERVAL_SECS
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_remote_command() -> String {
    DEFAULT_REMOTE_COMMAND.to_string()
}

pub fn default_submission_options() -> Vec<String> {
    vec!["validvarname=any".to_string(), "pagesize=max".to_string()]
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            report_interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            remote_command: default_remote_command(),
            submission_options: default_submission_options(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rsubmit").join("config.yml"))
    }

    /// Loads configuration from the default location.
    ///
    /// Returns `Ok(Config::default())` if no config file exists.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Loads configuration from a specific file path.
    ///
    /// Returns `Ok(Config::default())` if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}\n\n\
                 Suggestions:\n\
                 • Check file permissions: ls -la {}\n\
                 • Try recreating with: rsubmit config init --force",
                path.display(),
                e,
                path.display()
            ))
        })?;

        let config: Config = serde_yaml::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file {}: {}\n\n\
                 Suggestions:\n\
                 • Check YAML syntax in the config file\n\
                 • Verify indentation uses spaces, not tabs\n\
                 • Backup and recreate: mv {} {}.bak && rsubmit config init",
                path.display(),
                e,
                path.display(),
                path.display()
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a specific file path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let contents = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Rejects values that would make a job impossible to run.
    pub fn validate(&self) -> Result<()> {
        let d = &self.defaults;
        if d.port == 0 {
            return Err(Error::Config("defaults.port must be positive".to_string()));
        }
        if d.report_interval_secs == 0 {
            return Err(Error::Config(
                "defaults.report_interval_secs must be positive".to_string(),
            ));
        }
        if d.chunk_size == 0 {
            return Err(Error::Config(
                "defaults.chunk_size must be positive".to_string(),
            ));
        }
        if d.remote_command.trim().is_empty() {
            return Err(Error::Config(
                "defaults.remote_command must not be empty".to_string(),
            ));
        }
        if d.submission_options.iter().any(|o| o.trim().is_empty()) {
            return Err(Error::Config(
                "defaults.submission_options must not contain blank entries".to_string(),
            ));
        }
        for (host, profile) in &self.hosts {
            if profile.port == Some(0) {
                return Err(Error::Config(format!(
                    "hosts.{}.port must be positive",
                    host
                )));
            }
        }
        Ok(())
    }

    /// Gets the profile for a workspace host, if one is configured.
    pub fn host_profile(&self, host: &str) -> Option<&HostProfile> {
        self.hosts.get(host)
    }

    /// Port for `host`: host profile first, then the defaults.
    pub fn port_for(&self, host: &str) -> u16 {
        self.host_profile(host)
            .and_then(|p| p.port)
            .unwrap_or(self.defaults.port)
    }

    /// Remote command for `host`: host profile first, then the defaults.
    pub fn remote_command_for(&self, host: &str) -> &str {
        self.host_profile(host)
            .and_then(|p| p.remote_command.as_deref())
            .unwrap_or(&self.defaults.remote_command)
    }

    /// Username configured for `host`, if any.
    pub fn username_for(&self, host: &str) -> Option<&str> {
        self.host_profile(host).and_then(|p| p.username.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.hosts.is_empty());
        assert_eq!(config.defaults.port, 22);
        assert_eq!(config.defaults.report_interval_secs, 60);
        assert_eq!(config.defaults.chunk_size, 1000);
        assert_eq!(
            config.defaults.submission_options,
            vec!["validvarname=any", "pagesize=max"]
        );
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "defaults:\n  report_interval_secs: 5\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.defaults.report_interval_secs, 5);
        assert_eq!(config.defaults.port, DEFAULT_PORT);
        assert_eq!(config.defaults.remote_command, DEFAULT_REMOTE_COMMAND);
    }

    #[test]
    fn test_host_profile_precedence() {
        let mut config = Config::default();
        config.hosts.insert(
            "grid.example.com".to_string(),
            HostProfile {
                port: Some(2222),
                username: Some("analyst".to_string()),
                remote_command: Some("/opt/sas/bin/sas -stdio".to_string()),
            },
        );

        assert_eq!(config.port_for("grid.example.com"), 2222);
        assert_eq!(config.port_for("other.example.com"), 22);
        assert_eq!(
            config.remote_command_for("grid.example.com"),
            "/opt/sas/bin/sas -stdio"
        );
        assert_eq!(
            config.remote_command_for("other.example.com"),
            DEFAULT_REMOTE_COMMAND
        );
        assert_eq!(config.username_for("grid.example.com"), Some("analyst"));
        assert_eq!(config.username_for("other.example.com"), None);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yml");

        let mut config = Config::default();
        config.defaults.chunk_size = 50;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.defaults.chunk_size, 50);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "defaults:\n  report_interval_secs: 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_blank_submission_option() {
        let mut config = Config::default();
        config.defaults.submission_options.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "defaults: [unclosed").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
