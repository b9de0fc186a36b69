//! Job request construction and argument validation.
//!
//! Everything here runs before any connection is attempted, so a malformed
//! invocation fails fast with a [`Error::Validation`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::remote::HostTarget;

/// Caller-supplied values before validation. Optional fields fall back to
/// the configuration.
#[derive(Debug, Clone, Default)]
pub struct JobArgs {
    pub username: Option<String>,
    pub secret_file: PathBuf,
    pub host: String,
    pub port: Option<u16>,
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub report_interval_secs: Option<u64>,
    pub chunk_size: Option<usize>,
}

/// A validated submission. Paths are absolute and were checked to exist with
/// the right kind; the request is not modified after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub username: String,
    pub secret_file: PathBuf,
    pub host: String,
    pub port: u16,
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub report_interval: Duration,
    pub chunk_size: usize,
    pub connect_timeout: Duration,
}

impl JobRequest {
    /// Validates `args`, filling unset values from `config`.
    pub fn from_args(args: JobArgs, config: &Config) -> Result<Self> {
        let host = args.host.trim().to_string();
        if host.is_empty() {
            return Err(Error::Validation(
                "Workspace host must not be empty".to_string(),
            ));
        }

        let username = args
            .username
            .or_else(|| config.username_for(&host).map(str::to_string))
            .map(|u| u.trim().to_string())
            .unwrap_or_default();
        if username.is_empty() {
            return Err(Error::Validation(format!(
                "Username must not be empty (pass --user or set hosts.{}.username in the config)",
                host
            )));
        }

        let port = args.port.unwrap_or_else(|| config.port_for(&host));
        if port == 0 {
            return Err(Error::Validation(
                "Port must be a positive integer".to_string(),
            ));
        }

        let report_interval_secs = args
            .report_interval_secs
            .unwrap_or(config.defaults.report_interval_secs);
        if report_interval_secs == 0 {
            return Err(Error::Validation(
                "Report interval must be a positive number of seconds".to_string(),
            ));
        }

        let chunk_size = args.chunk_size.unwrap_or(config.defaults.chunk_size);
        if chunk_size == 0 {
            return Err(Error::Validation(
                "Chunk size must be a positive integer".to_string(),
            ));
        }

        let secret_file = require_file(&args.secret_file, "Secret file")?;
        let source = require_file(&args.source, "Source code file")?;
        let output_dir = require_dir(&args.output_dir, "Output directory")?;

        Ok(Self {
            username,
            secret_file,
            host,
            port,
            source,
            output_dir,
            report_interval: Duration::from_secs(report_interval_secs),
            chunk_size,
            connect_timeout: Duration::from_secs(config.defaults.connect_timeout_secs),
        })
    }

    /// Connection parameters for the remote session.
    pub fn target(&self) -> HostTarget {
        HostTarget {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            connect_timeout: self.connect_timeout,
        }
    }
}

fn require_file(path: &Path, what: &str) -> Result<PathBuf> {
    let resolved = resolve(path, what)?;
    if !resolved.is_file() {
        return Err(Error::Validation(format!(
            "{} is not a regular file: {}",
            what,
            path.display()
        )));
    }
    Ok(resolved)
}

fn require_dir(path: &Path, what: &str) -> Result<PathBuf> {
    let resolved = resolve(path, what)?;
    if !resolved.is_dir() {
        return Err(Error::Validation(format!(
            "{} is not a directory: {}",
            what,
            path.display()
        )));
    }
    Ok(resolved)
}

fn resolve(path: &Path, what: &str) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::Validation(format!("{} path must not be empty", what)));
    }
    fs::canonicalize(path).map_err(|e| {
        Error::Validation(format!("{} not found: {} ({})", what, path.display(), e))
    })
}
