//! The `submit` subcommand: validate, run one job, report where its output went.

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rsubmit::artifacts::format_timestamp;
use rsubmit::job::ArtifactReport;
use rsubmit::progress::{format_elapsed, ConsoleReporter, LogReporter, ProgressReporter};
use rsubmit::remote::{SshBackend, SubmissionOptions};
use rsubmit::{JobArgs, JobRequest, JobRunner, PreparedJob};

use super::load_config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// Colored lines on stdout
    Console,
    /// Info-level log records
    Log,
}

#[derive(Args)]
#[command(about = "Submit a program and wait for its log and listing")]
pub struct SubmitCommand {
    /// Username on the workspace host (falls back to the host profile in the config)
    #[arg(short, long)]
    pub user: Option<String>,

    /// File holding the credential for the workspace host
    #[arg(short, long, value_name = "PATH")]
    pub secret_file: PathBuf,

    /// Fully-qualified name of the workspace host
    #[arg(long)]
    pub host: String,

    /// Port on the workspace host
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Program to submit
    #[arg(short = 'f', long, value_name = "PATH")]
    pub source: PathBuf,

    /// Directory receiving the log and listing files
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: PathBuf,

    /// Seconds between progress reports while the job runs
    #[arg(short, long, value_name = "SECS")]
    pub report_every: Option<u64>,

    /// Lines fetched per output drain call
    #[arg(long, value_name = "LINES")]
    pub chunk_size: Option<usize>,

    /// Command started on the workspace host to run the program
    #[arg(long)]
    pub remote_command: Option<String>,

    /// Where progress lines go
    #[arg(long, value_enum, default_value_t = ProgressMode::Console)]
    pub progress: ProgressMode,

    /// Validate and show the resolved job without connecting
    #[arg(long)]
    pub dry_run: bool,
}

impl SubmitCommand {
    pub fn execute(self, config_path: Option<&Path>) -> Result<()> {
        // One capture for both artifact names.
        let started_at = Local::now();
        let config = load_config(config_path)?;

        let args = JobArgs {
            username: self.user,
            secret_file: self.secret_file,
            host: self.host,
            port: self.port,
            source: self.source,
            output_dir: self.output_dir,
            report_interval_secs: self.report_every,
            chunk_size: self.chunk_size,
        };
        let request = JobRequest::from_args(args, &config).map_err(describe)?;

        let backend = SshBackend::new(
            self.remote_command
                .unwrap_or_else(|| config.remote_command_for(&request.host).to_string()),
        );
        let options = SubmissionOptions::new(config.defaults.submission_options.clone());
        let job = PreparedJob::prepare(request, options, &format_timestamp(&started_at))
            .map_err(describe)?;

        if self.dry_run {
            print_plan(&job, &backend);
            return Ok(());
        }

        println!(
            "Submitting {} to {}",
            job.request.source.display(),
            job.request.target().connection_string()
        );

        let reporter: Box<dyn ProgressReporter> = match self.progress {
            ProgressMode::Console => Box::new(ConsoleReporter::with_random_color()),
            ProgressMode::Log => Box::new(LogReporter),
        };

        let runner = JobRunner::new(Arc::new(backend));
        let report = runner.run(job, reporter.as_ref());
        let elapsed = report.elapsed;

        let outcome = report.into_result().map_err(describe)?;

        println!("Job completed in {}", format_elapsed(elapsed));
        print_artifact("Log", &outcome.log);
        print_artifact("Listing", &outcome.listing);
        Ok(())
    }
}

fn describe(e: rsubmit::Error) -> anyhow::Error {
    anyhow!("{}: {}", e.kind(), e)
}

fn print_artifact(label: &str, artifact: &ArtifactReport) {
    if artifact.created {
        println!(
            "  {}: {} ({} lines)",
            label,
            artifact.path.display(),
            artifact.lines
        );
    } else {
        println!("  {}: not produced", label);
    }
}

fn print_plan(job: &PreparedJob, backend: &SshBackend) {
    let request = &job.request;
    println!("[DRY RUN] Would submit:");
    println!("  Source: {}", request.source.display());
    println!("  Target: {}", request.target().connection_string());
    println!("  Remote command: {}", backend.remote_command());
    println!(
        "  Report interval: {}",
        format_elapsed(request.report_interval)
    );
    println!("  Chunk size: {} lines", request.chunk_size);
    println!("  Log: {}", job.artifacts.log.display());
    println!("  Listing: {}", job.artifacts.listing.display());

    let preamble = job.options.preamble();
    if preamble.is_empty() {
        println!("  Preamble: (none)");
    } else {
        println!("  Preamble:");
        for line in preamble.lines() {
            println!("    {}", line);
        }
    }
}
