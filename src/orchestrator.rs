//! Glue between a prepared job, its backend, and the supervisor.

use log::info;
use std::sync::Arc;

use crate::progress::ProgressReporter;
use crate::remote::SessionBackend;
use crate::supervisor::{JobReport, Supervisor};
use crate::worker::{run_job, PreparedJob};

/// Runs prepared jobs against one backend.
pub struct JobRunner {
    backend: Arc<dyn SessionBackend>,
}

impl JobRunner {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Runs `job` on a worker thread, reporting progress to `reporter` at the
    /// job's interval, and returns once the job is terminal.
    pub fn run(&self, job: PreparedJob, reporter: &dyn ProgressReporter) -> JobReport {
        info!(
            "Running {} on {}",
            job.request.source.display(),
            job.request.target().connection_string()
        );

        let supervisor = Supervisor::new(job.request.report_interval);
        let backend = Arc::clone(&self.backend);
        supervisor.run(reporter, move |events| {
            run_job(backend.as_ref(), &job, events)
        })
    }
}
