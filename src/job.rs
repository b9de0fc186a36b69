//! Job lifecycle types shared by the worker and the supervisor.

use std::fmt;
use std::path::PathBuf;

use crate::error::Result;
use crate::remote::OutputStream;

/// Status of the background unit of work.
///
/// `Running` is the only non-terminal state; once `Completed` or `Failed` is
/// reached the state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }

    /// Moves to `next` if allowed and returns the resulting state.
    ///
    /// Terminal states absorb every transition, and nothing moves back to
    /// `Running`.
    pub fn transition(&mut self, next: JobState) -> JobState {
        if *self == JobState::Running && next.is_terminal() {
            *self = next;
        }
        *self
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "Running"),
            JobState::Completed => write!(f, "Completed"),
            JobState::Failed => write!(f, "Failed"),
        }
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub log: ArtifactReport,
    pub listing: ArtifactReport,
}

/// Final state of one output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub path: PathBuf,
    pub lines: usize,
    /// False when the stream was empty and no file was written
    pub created: bool,
}

/// Notifications sent from the worker to the supervisor.
#[derive(Debug)]
pub enum JobEvent {
    Connected,
    Submitted,
    Drained { stream: OutputStream, lines: usize },
    Finished(Result<JobOutcome>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_to_terminal() {
        let mut state = JobState::Running;
        assert!(!state.is_terminal());
        assert_eq!(state.transition(JobState::Completed), JobState::Completed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_never_revert() {
        let mut state = JobState::Failed;
        assert_eq!(state.transition(JobState::Running), JobState::Failed);
        assert_eq!(state.transition(JobState::Completed), JobState::Failed);

        let mut state = JobState::Completed;
        assert_eq!(state.transition(JobState::Failed), JobState::Completed);
    }
}
