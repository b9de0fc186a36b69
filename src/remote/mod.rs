//! Remote session client.
//!
//! A job talks to its workspace host through two small traits:
//! [`SessionBackend`] opens a connection and [`BackendConnection`] carries one
//! submission plus the two output buffers. The wire protocol lives entirely
//! behind those traits; [`ssh`] provides the production backend.
//!
//! [`RemoteSession`] wraps a backend connection with the behavior every job
//! relies on regardless of backend: the submission-options preamble, error
//! classification, and closing exactly once.

pub mod options;
pub mod ssh;

use log::{debug, info, warn};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::secret::Secret;

pub use options::SubmissionOptions;
pub use ssh::SshBackend;

/// Which output buffer a drain call reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Log,
    Listing,
}

impl OutputStream {
    pub fn name(self) -> &'static str {
        match self {
            OutputStream::Log => "log",
            OutputStream::Listing => "listing",
        }
    }
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub connect_timeout: Duration,
}

impl HostTarget {
    /// Returns `user@host:port`.
    pub fn connection_string(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Opens connections to an execution host.
pub trait SessionBackend: Send + Sync {
    /// Connects and authenticates.
    ///
    /// Fails with [`Error::Connection`] when the host is unreachable, the
    /// handshake fails, or the credentials are rejected.
    fn connect(&self, target: &HostTarget, secret: &Secret) -> Result<Box<dyn BackendConnection>>;
}

/// One live connection to an execution host.
pub trait BackendConnection: Send {
    /// Runs `program` and blocks until the remote execution finishes.
    ///
    /// Errors raised by the program itself belong in the log, not in the
    /// returned `Result`.
    fn submit(&mut self, program: &str) -> Result<()>;

    /// Returns up to `max_lines` lines not yet returned from `stream`; an
    /// empty vector means the stream is exhausted.
    fn fetch(&mut self, stream: OutputStream, max_lines: usize) -> Result<Vec<String>>;

    /// Releases remote resources.
    fn close(&mut self) -> Result<()>;
}

/// A connected session that applies submission options and closes exactly once.
///
/// Dropping an open session closes it, so every exit path releases the
/// connection even when an error short-circuits the caller.
pub struct RemoteSession {
    connection: Box<dyn BackendConnection>,
    options: SubmissionOptions,
    label: String,
    closed: bool,
}

impl RemoteSession {
    /// Opens a session through `backend`.
    pub fn connect(
        backend: &dyn SessionBackend,
        target: &HostTarget,
        secret: &Secret,
        options: SubmissionOptions,
    ) -> Result<Self> {
        let label = target.connection_string();
        info!("Connecting to {}", label);

        let connection = backend.connect(target, secret).map_err(|e| match e {
            Error::Connection(_) => e,
            other => Error::Connection(other.to_string()),
        })?;

        debug!("Connected to {}", label);
        Ok(Self {
            connection,
            options,
            label,
            closed: false,
        })
    }

    /// Prepends the option preamble to `source` and submits it, blocking until
    /// the remote execution finishes.
    pub fn submit(&mut self, source: &str) -> Result<()> {
        self.ensure_open()?;
        let program = self.options.apply(source);
        info!("Submitting {} bytes to {}", program.len(), self.label);

        self.connection.submit(&program).map_err(|e| match e {
            Error::Submission(_) => e,
            other => Error::Submission(other.to_string()),
        })
    }

    /// Next chunk of at most `chunk_size` log lines.
    pub fn drain_log(&mut self, chunk_size: usize) -> Result<Vec<String>> {
        self.drain(OutputStream::Log, chunk_size)
    }

    /// Next chunk of at most `chunk_size` listing lines.
    pub fn drain_listing(&mut self, chunk_size: usize) -> Result<Vec<String>> {
        self.drain(OutputStream::Listing, chunk_size)
    }

    fn drain(&mut self, stream: OutputStream, chunk_size: usize) -> Result<Vec<String>> {
        if self.closed {
            return Err(Error::Drain {
                stream: stream.name(),
                message: "session is closed".to_string(),
            });
        }

        self.connection
            .fetch(stream, chunk_size)
            .map_err(|e| match e {
                Error::Drain { .. } => e,
                other => Error::Drain {
                    stream: stream.name(),
                    message: other.to_string(),
                },
            })
    }

    /// Closes the connection. Calls after the first are no-ops.
    ///
    /// A failure to close is logged rather than returned so it never masks the
    /// job's own result.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.connection.close() {
            Ok(()) => debug!("Closed session to {}", self.label),
            Err(e) => warn!("Failed to close session to {}: {}", self.label, e),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Submission(format!(
                "session to {} is closed",
                self.label
            )));
        }
        Ok(())
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        submitted: Vec<String>,
        closes: usize,
    }

    struct FakeConnection {
        calls: Arc<Mutex<Calls>>,
        log: Vec<String>,
        fail_submit: bool,
    }

    impl BackendConnection for FakeConnection {
        fn submit(&mut self, program: &str) -> Result<()> {
            if self.fail_submit {
                return Err(Error::Io(std::io::Error::other("broken pipe")));
            }
            self.calls.lock().unwrap().submitted.push(program.to_string());
            Ok(())
        }

        fn fetch(&mut self, stream: OutputStream, max_lines: usize) -> Result<Vec<String>> {
            match stream {
                OutputStream::Log => {
                    let n = max_lines.min(self.log.len());
                    Ok(self.log.drain(..n).collect())
                }
                OutputStream::Listing => Err(Error::Io(std::io::Error::other("reset"))),
            }
        }

        fn close(&mut self) -> Result<()> {
            self.calls.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    struct FakeBackend {
        calls: Arc<Mutex<Calls>>,
        fail_submit: bool,
    }

    impl SessionBackend for FakeBackend {
        fn connect(&self, _: &HostTarget, _: &Secret) -> Result<Box<dyn BackendConnection>> {
            Ok(Box::new(FakeConnection {
                calls: Arc::clone(&self.calls),
                log: vec!["a".into(), "b".into(), "c".into()],
                fail_submit: self.fail_submit,
            }))
        }
    }

    struct RefusingBackend;

    impl SessionBackend for RefusingBackend {
        fn connect(&self, _: &HostTarget, _: &Secret) -> Result<Box<dyn BackendConnection>> {
            Err(Error::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )))
        }
    }

    fn target() -> HostTarget {
        HostTarget {
            host: "workspace.example.com".to_string(),
            port: 8591,
            username: "analyst".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    fn fake(fail_submit: bool) -> (FakeBackend, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        (
            FakeBackend {
                calls: Arc::clone(&calls),
                fail_submit,
            },
            calls,
        )
    }

    #[test]
    fn test_connection_string() {
        assert_eq!(
            target().connection_string(),
            "analyst@workspace.example.com:8591"
        );
    }

    #[test]
    fn test_submit_prepends_preamble() {
        let (backend, calls) = fake(false);
        let mut session = RemoteSession::connect(
            &backend,
            &target(),
            &Secret::new("pw"),
            SubmissionOptions::default(),
        )
        .unwrap();

        session.submit("data x; run;").unwrap();

        let submitted = calls.lock().unwrap().submitted.clone();
        assert_eq!(
            submitted,
            vec!["options validvarname=any;\noptions pagesize=max;\ndata x; run;".to_string()]
        );
    }

    #[test]
    fn test_close_is_idempotent_and_runs_on_drop() {
        let (backend, calls) = fake(false);
        {
            let mut session = RemoteSession::connect(
                &backend,
                &target(),
                &Secret::new("pw"),
                SubmissionOptions::none(),
            )
            .unwrap();
            session.close();
            session.close();
            assert!(session.is_closed());
        }
        assert_eq!(calls.lock().unwrap().closes, 1);

        {
            let _session = RemoteSession::connect(
                &backend,
                &target(),
                &Secret::new("pw"),
                SubmissionOptions::none(),
            )
            .unwrap();
        }
        assert_eq!(calls.lock().unwrap().closes, 2);
    }

    #[test]
    fn test_errors_are_classified() {
        let err = RemoteSession::connect(
            &RefusingBackend,
            &target(),
            &Secret::new("pw"),
            SubmissionOptions::none(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Connection(_)));

        let (backend, _) = fake(true);
        let mut session = RemoteSession::connect(
            &backend,
            &target(),
            &Secret::new("pw"),
            SubmissionOptions::none(),
        )
        .unwrap();
        assert!(matches!(
            session.submit("run;").unwrap_err(),
            Error::Submission(_)
        ));
        assert!(matches!(
            session.drain_listing(10).unwrap_err(),
            Error::Drain {
                stream: "listing",
                ..
            }
        ));
    }

    #[test]
    fn test_drain_after_close_fails() {
        let (backend, _) = fake(false);
        let mut session = RemoteSession::connect(
            &backend,
            &target(),
            &Secret::new("pw"),
            SubmissionOptions::none(),
        )
        .unwrap();

        assert_eq!(session.drain_log(2).unwrap(), vec!["a", "b"]);
        session.close();
        assert!(session.drain_log(2).is_err());
        assert!(session.submit("run;").is_err());
    }
}
