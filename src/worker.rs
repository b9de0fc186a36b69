//! The worker side of a job: connect, submit, drain both outputs, close.
//!
//! Every step runs strictly in that order on one thread. The session is
//! closed on every path out of [`run_job`] once a connection exists.

use log::{debug, info};
use std::fs;
use std::sync::mpsc::Sender;

use crate::artifacts::{drain_to_exhaustion, ArtifactPaths, OutputArtifact};
use crate::error::{Error, Result};
use crate::job::{ArtifactReport, JobEvent, JobOutcome};
use crate::remote::{OutputStream, RemoteSession, SessionBackend, SubmissionOptions};
use crate::request::JobRequest;
use crate::secret::Secret;

/// Everything the worker needs, resolved before it is spawned.
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub request: JobRequest,
    pub secret: Secret,
    pub source_text: String,
    pub artifacts: ArtifactPaths,
    pub options: SubmissionOptions,
}

impl PreparedJob {
    /// Loads the secret and the source text and names the artifacts with
    /// `timestamp`.
    pub fn prepare(request: JobRequest, options: SubmissionOptions, timestamp: &str) -> Result<Self> {
        let secret = Secret::load_from_file(&request.secret_file)?;
        let source_text = fs::read_to_string(&request.source).map_err(|e| {
            Error::Validation(format!(
                "Failed to read source file {}: {}",
                request.source.display(),
                e
            ))
        })?;
        let artifacts = ArtifactPaths::new(&request.source, &request.output_dir, timestamp)?;

        Ok(Self {
            request,
            secret,
            source_text,
            artifacts,
            options,
        })
    }
}

/// Runs one job to completion, reporting each step on `events`.
///
/// Send failures are ignored: a supervisor that stopped listening does not
/// change what the job has to do.
pub fn run_job(
    backend: &dyn SessionBackend,
    job: &PreparedJob,
    events: &Sender<JobEvent>,
) -> Result<JobOutcome> {
    let target = job.request.target();
    let mut session = RemoteSession::connect(backend, &target, &job.secret, job.options.clone())?;
    let _ = events.send(JobEvent::Connected);

    let result = run_session(&mut session, job, events);
    session.close();

    match &result {
        Ok(outcome) => info!(
            "Job finished: {} log lines, {} listing lines",
            outcome.log.lines, outcome.listing.lines
        ),
        Err(e) => debug!("Job failed: {}", e),
    }
    result
}

fn run_session(
    session: &mut RemoteSession,
    job: &PreparedJob,
    events: &Sender<JobEvent>,
) -> Result<JobOutcome> {
    session.submit(&job.source_text)?;
    let _ = events.send(JobEvent::Submitted);

    let chunk_size = job.request.chunk_size;

    let mut log = OutputArtifact::new(job.artifacts.log.clone());
    let summary = drain_to_exhaustion(&mut log, chunk_size, |n| session.drain_log(n))?;
    let _ = events.send(JobEvent::Drained {
        stream: OutputStream::Log,
        lines: summary.lines,
    });

    let mut listing = OutputArtifact::new(job.artifacts.listing.clone());
    let summary = drain_to_exhaustion(&mut listing, chunk_size, |n| session.drain_listing(n))?;
    let _ = events.send(JobEvent::Drained {
        stream: OutputStream::Listing,
        lines: summary.lines,
    });

    Ok(JobOutcome {
        log: report(&log),
        listing: report(&listing),
    })
}

fn report(artifact: &OutputArtifact) -> ArtifactReport {
    ArtifactReport {
        path: artifact.path().to_path_buf(),
        lines: artifact.lines_written(),
        created: artifact.is_created(),
    }
}
