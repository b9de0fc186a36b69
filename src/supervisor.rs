//! Job supervisor: runs the worker on its own thread and polls it.
//!
//! The supervisor waits on the worker's notification channel with a bounded
//! timeout. Each time a reporting deadline passes while the worker is still
//! running, the elapsed time goes to the [`ProgressReporter`]. Deadlines are
//! fixed multiples of the interval from spawn time, so notifications arriving
//! in between never shift the schedule.
//!
//! A timeout never cancels the worker. The only ways out of the loop are the
//! worker's terminal notification or the worker thread dying without one.

use log::{debug, info, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::job::{JobEvent, JobOutcome, JobState};
use crate::progress::{format_elapsed, ProgressReporter};

/// Final report of a supervised job.
#[derive(Debug)]
pub struct JobReport {
    pub state: JobState,
    pub result: Result<JobOutcome>,
    /// Number of progress lines emitted while waiting
    pub progress_reports: usize,
    pub elapsed: Duration,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Completed
    }

    pub fn into_result(self) -> Result<JobOutcome> {
        self.result
    }
}

/// Spawns one worker and polls it at a fixed interval.
#[derive(Debug, Clone)]
pub struct Supervisor {
    report_interval: Duration,
}

impl Supervisor {
    pub fn new(report_interval: Duration) -> Self {
        Self { report_interval }
    }

    /// Runs `work` on a new thread and blocks until it reaches a terminal state.
    ///
    /// `work` receives the sender for intermediate notifications; its return
    /// value becomes the terminal notification.
    pub fn run<F>(&self, reporter: &dyn ProgressReporter, work: F) -> JobReport
    where
        F: FnOnce(&Sender<JobEvent>) -> Result<JobOutcome> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let started = Instant::now();
        let mut state = JobState::Running;

        let spawned = thread::Builder::new()
            .name("rsubmit-worker".to_string())
            .spawn(move || {
                let result = work(&tx);
                let _ = tx.send(JobEvent::Finished(result));
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                state.transition(JobState::Failed);
                return JobReport {
                    state,
                    result: Err(Error::Io(e)),
                    progress_reports: 0,
                    elapsed: started.elapsed(),
                };
            }
        };

        debug!(
            "Worker spawned; reporting every {}",
            format_elapsed(self.report_interval)
        );

        let mut progress_reports = 0;
        let mut next_report = started + self.report_interval;

        let result = loop {
            let now = Instant::now();
            if now >= next_report {
                progress_reports += 1;
                reporter.report(started.elapsed());
                next_report += self.report_interval;
                continue;
            }

            match rx.recv_timeout(next_report - now) {
                Ok(JobEvent::Finished(result)) => break result,
                Ok(event) => note(&event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break Err(Error::WorkerPanicked),
            }
        };

        for event in rx.try_iter() {
            note(&event);
        }

        if handle.join().is_err() {
            warn!("Worker thread panicked");
        }

        match &result {
            Ok(_) => state.transition(JobState::Completed),
            Err(_) => state.transition(JobState::Failed),
        };

        let elapsed = started.elapsed();
        info!("Job {} after {}", state, format_elapsed(elapsed));

        JobReport {
            state,
            result,
            progress_reports,
            elapsed,
        }
    }
}

fn note(event: &JobEvent) {
    match event {
        JobEvent::Connected => info!("Connected to workspace"),
        JobEvent::Submitted => info!("Program submitted and finished remotely"),
        JobEvent::Drained { stream, lines } => info!("Retrieved {} {} lines", lines, stream),
        JobEvent::Finished(_) => debug!("Ignoring duplicate terminal notification"),
    }
}
