//! Submit a program to a remote analytics workspace, wait for it while
//! reporting progress, and retrieve its log and listing into timestamped
//! files.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod remote;
pub mod request;
pub mod secret;
pub mod supervisor;
pub mod worker;

pub use error::{Error, Result, RsubmitError};
pub use job::{JobOutcome, JobState};
pub use orchestrator::JobRunner;
pub use request::{JobArgs, JobRequest};
pub use supervisor::{JobReport, Supervisor};
pub use worker::PreparedJob;
