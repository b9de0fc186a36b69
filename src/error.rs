use thiserror::Error;

#[derive(Error, Debug)]
pub enum RsubmitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Failed to drain {stream} output: {message}")]
    Drain {
        stream: &'static str,
        message: String,
    },

    #[error("Worker thread terminated without reporting a result")]
    WorkerPanicked,
}

impl RsubmitError {
    /// Short name of the error kind, used as the prefix of user-facing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RsubmitError::Io(_) => "IoError",
            RsubmitError::Validation(_) => "ValidationError",
            RsubmitError::Config(_) => "ConfigError",
            RsubmitError::Connection(_) => "ConnectionError",
            RsubmitError::Submission(_) => "SubmissionError",
            RsubmitError::Drain { .. } => "DrainError",
            RsubmitError::WorkerPanicked => "WorkerError",
        }
    }
}

pub type Error = RsubmitError;
pub type Result<T> = std::result::Result<T, Error>;
