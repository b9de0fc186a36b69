//! Output artifacts: naming, append-only file sinks, and the drain loop.

use chrono::{DateTime, TimeZone};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Timestamp layout embedded in artifact names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Formats the capture time the way artifact names embed it.
pub fn format_timestamp<Tz: TimeZone>(captured_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    captured_at.format(TIMESTAMP_FORMAT).to_string()
}

/// Destination paths for the log and listing of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub log: PathBuf,
    pub listing: PathBuf,
}

impl ArtifactPaths {
    /// Builds `{source file name}__{timestamp}.log` and `.lst` inside `output_dir`.
    ///
    /// Both paths share `timestamp`, which should be captured once when the
    /// invocation starts.
    pub fn new(source: &Path, output_dir: &Path, timestamp: &str) -> Result<Self> {
        let base = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Source path has no file name: {}",
                    source.display()
                ))
            })?;

        let stem = format!("{}__{}", base, timestamp);
        Ok(Self {
            log: output_dir.join(format!("{}.log", stem)),
            listing: output_dir.join(format!("{}.lst", stem)),
        })
    }
}

/// Append-only text file that is created lazily on the first non-empty chunk.
#[derive(Debug)]
pub struct OutputArtifact {
    path: PathBuf,
    file: Option<File>,
    lines_written: usize,
}

impl OutputArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            lines_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// True once at least one chunk has been written.
    pub fn is_created(&self) -> bool {
        self.file.is_some()
    }

    /// Appends `lines`, one per line, flushing before returning.
    ///
    /// An empty slice is a no-op and does not create the file. The first
    /// non-empty chunk creates the file and fails if it already exists, so two
    /// runs that started in the same second never share an artifact.
    pub fn append(&mut self, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        if self.file.is_none() {
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
                .map_err(|e| {
                    let message = if e.kind() == ErrorKind::AlreadyExists {
                        format!(
                            "Output file already exists: {} (another run started in the same second?)",
                            self.path.display()
                        )
                    } else {
                        format!("Failed to create {}: {}", self.path.display(), e)
                    };
                    Error::Io(std::io::Error::new(e.kind(), message))
                })?;
            debug!("Created output artifact {}", self.path.display());
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            for line in lines {
                file.write_all(line.as_bytes())?;
                file.write_all(b"\n")?;
            }
            file.flush()?;
        }

        self.lines_written += lines.len();
        Ok(())
    }
}

/// Totals from draining one output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Number of non-empty chunks received
    pub chunks: usize,
    /// Number of lines written
    pub lines: usize,
}

/// Calls `fetch(chunk_size)` until it returns an empty chunk, appending every
/// non-empty chunk to `artifact` before asking for the next one.
///
/// Chunks already written stay on disk if `fetch` or a write fails.
pub fn drain_to_exhaustion<F>(
    artifact: &mut OutputArtifact,
    chunk_size: usize,
    mut fetch: F,
) -> Result<DrainSummary>
where
    F: FnMut(usize) -> Result<Vec<String>>,
{
    let mut summary = DrainSummary::default();

    loop {
        let chunk = fetch(chunk_size)?;
        if chunk.is_empty() {
            break;
        }
        artifact.append(&chunk)?;
        summary.chunks += 1;
        summary.lines += chunk.len();
    }

    debug!(
        "Drained {} lines in {} chunks into {}",
        summary.lines,
        summary.chunks,
        artifact.path().display()
    );
    Ok(summary)
}
