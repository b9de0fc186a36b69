//! SSH backend for the remote session client.
//!
//! The workspace host is reached over SSH with password authentication using
//! the loaded secret. A submission starts the configured remote command, feeds
//! it the program on stdin, and waits for it to exit. The command's stderr is
//! the job log and its stdout is the listing; both are buffered in full and
//! handed out line by line through [`BackendConnection::fetch`].

use log::{debug, info, warn};
use ssh2::Session;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use super::{BackendConnection, HostTarget, OutputStream, SessionBackend};
use crate::error::{Error, Result};
use crate::secret::Secret;

/// Connects over SSH and runs `remote_command` for each submission.
#[derive(Debug, Clone)]
pub struct SshBackend {
    remote_command: String,
}

impl SshBackend {
    pub fn new(remote_command: impl Into<String>) -> Self {
        Self {
            remote_command: remote_command.into(),
        }
    }

    pub fn remote_command(&self) -> &str {
        &self.remote_command
    }

    fn open_session(&self, target: &HostTarget, secret: &Secret) -> Result<Session> {
        let addr_str = format!("{}:{}", target.host, target.port);
        let addr = addr_str
            .to_socket_addrs()
            .map_err(|e| {
                Error::Connection(format!("Failed to resolve host '{}': {}", target.host, e))
            })?
            .next()
            .ok_or_else(|| {
                Error::Connection(format!("No addresses found for host '{}'", target.host))
            })?;

        let tcp = TcpStream::connect_timeout(&addr, target.connect_timeout).map_err(|e| {
            Error::Connection(format!("Failed to connect to {}: {}", target.host, e))
        })?;

        let mut sess = Session::new()
            .map_err(|e| Error::Connection(format!("Failed to create SSH session: {}", e)))?;
        sess.set_tcp_stream(tcp);
        sess.set_timeout(timeout_ms(target.connect_timeout));
        sess.handshake()
            .map_err(|e| Error::Connection(format!("SSH handshake failed: {}", e)))?;

        debug!("Authenticating as user: {}", target.username);
        sess.userauth_password(&target.username, secret.expose())
            .map_err(|e| {
                Error::Connection(format!(
                    "Authentication failed for user {}: {}",
                    target.username, e
                ))
            })?;

        if !sess.authenticated() {
            return Err(Error::Connection(format!(
                "Authentication failed for user {}: server did not accept the credentials",
                target.username
            )));
        }

        // Only connection setup is bounded; a submission may run for hours.
        sess.set_timeout(0);
        Ok(sess)
    }
}

impl SessionBackend for SshBackend {
    fn connect(&self, target: &HostTarget, secret: &Secret) -> Result<Box<dyn BackendConnection>> {
        let session = self.open_session(target, secret).map_err(|e| {
            Error::Connection(diagnose_connection_error(&e, &target.host, target.port))
        })?;

        info!("SSH session established with {}", target.connection_string());
        Ok(Box::new(SshConnection {
            session,
            remote_command: self.remote_command.clone(),
            log: VecDeque::new(),
            listing: VecDeque::new(),
        }))
    }
}

fn timeout_ms(timeout: std::time::Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

/// A live SSH session plus the buffered output of its submission.
struct SshConnection {
    session: Session,
    remote_command: String,
    log: VecDeque<String>,
    listing: VecDeque<String>,
}

impl BackendConnection for SshConnection {
    fn submit(&mut self, program: &str) -> Result<()> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| Error::Submission(format!("Failed to open channel: {}", e)))?;

        debug!("Starting remote command: {}", self.remote_command);
        channel
            .exec(&self.remote_command)
            .map_err(|e| Error::Submission(format!("Failed to start remote command: {}", e)))?;

        channel
            .write_all(program.as_bytes())
            .map_err(|e| Error::Submission(format!("Failed to send program: {}", e)))?;
        channel
            .send_eof()
            .map_err(|e| Error::Submission(format!("Failed to send end of input: {}", e)))?;

        // Both streams are buffered before either read error is reported.
        let mut stdout = Vec::new();
        let listing_read = channel.read_to_end(&mut stdout);
        let mut stderr = Vec::new();
        let log_read = channel.stderr().read_to_end(&mut stderr);
        self.log.extend(split_output_lines(&stderr));
        self.listing.extend(split_output_lines(&stdout));

        log_read.map_err(|e| Error::Submission(format!("Failed to read log: {}", e)))?;
        listing_read.map_err(|e| Error::Submission(format!("Failed to read listing: {}", e)))?;

        channel
            .wait_close()
            .map_err(|e| Error::Submission(format!("Failed to close channel: {}", e)))?;

        let exit_code = channel
            .exit_status()
            .map_err(|e| Error::Submission(format!("Failed to get exit status: {}", e)))?;

        // Non-zero means the program reported warnings or errors; details are in the log.
        if exit_code != 0 {
            warn!("Remote program finished with exit code {}", exit_code);
        } else {
            debug!("Remote program finished with exit code 0");
        }

        Ok(())
    }

    fn fetch(&mut self, stream: OutputStream, max_lines: usize) -> Result<Vec<String>> {
        let buffer = match stream {
            OutputStream::Log => &mut self.log,
            OutputStream::Listing => &mut self.listing,
        };
        let n = max_lines.min(buffer.len());
        Ok(buffer.drain(..n).collect())
    }

    fn close(&mut self) -> Result<()> {
        self.session
            .disconnect(None, "job finished", None)
            .map_err(|e| Error::Connection(format!("Failed to disconnect: {}", e)))
    }
}

/// Splits raw command output into lines.
///
/// The remote session may write in a legacy encoding, so bytes that are not
/// valid UTF-8 become U+FFFD instead of failing the job. Both `\n` and `\r\n`
/// end a line.
fn split_output_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Builds a connection error message with troubleshooting suggestions.
pub fn diagnose_connection_error(error: &Error, host: &str, port: u16) -> String {
    let error_str = error.to_string().to_lowercase();
    let mut suggestions = Vec::new();

    if error_str.contains("resolve") || error_str.contains("no addresses") {
        suggestions.push(format!("• Check the spelling of the host name '{}'", host));
        suggestions.push("• Use the fully-qualified host name".to_string());
    }

    if error_str.contains("refused")
        || error_str.contains("timed out")
        || error_str.contains("no route to host")
    {
        suggestions.push(format!("• Verify the host '{}' is reachable", host));
        suggestions.push(format!("• Check that the service listens on port {}", port));
        suggestions.push("• Verify your network connection and firewall settings".to_string());
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        suggestions.push("• Verify the username".to_string());
        suggestions.push("• Regenerate the secret file; it may be stale".to_string());
    }

    if suggestions.is_empty() {
        suggestions.push("• Verify the remote host is accessible".to_string());
        suggestions.push(format!("• Test the connection manually: ssh -p {} {}", port, host));
    }

    format!(
        "{}\n\nTroubleshooting suggestions:\n{}",
        strip_kind_prefix(error),
        suggestions.join("\n")
    )
}

fn strip_kind_prefix(error: &Error) -> String {
    match error {
        Error::Connection(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_split_output_replaces_invalid_utf8() {
        // 0xE9 is 'é' in latin1.
        let lines = split_output_lines(b"caf\xe9\nNOTE: ok\n");
        assert_eq!(lines, vec!["caf\u{FFFD}".to_string(), "NOTE: ok".to_string()]);
    }

    #[test]
    fn test_split_output_handles_crlf_and_missing_final_newline() {
        let lines = split_output_lines(b"Obs  Name\r\n1    Alfred\r\n\r\n2    Alice");
        assert_eq!(lines, vec!["Obs  Name", "1    Alfred", "", "2    Alice"]);
    }

    #[test]
    fn test_split_output_of_nothing_is_empty() {
        assert!(split_output_lines(b"").is_empty());
    }

    #[test]
    fn test_diagnose_unresolvable_host() {
        let err = Error::Connection("Failed to resolve host 'nohost': not known".to_string());
        let message = diagnose_connection_error(&err, "nohost", 22);
        assert!(message.starts_with("Failed to resolve host 'nohost'"));
        assert!(message.contains("fully-qualified"));
    }

    #[test]
    fn test_diagnose_authentication() {
        let err = Error::Connection("Authentication failed for user bob: denied".to_string());
        let message = diagnose_connection_error(&err, "ws", 22);
        assert!(message.contains("Regenerate the secret file"));
        assert!(!message.contains("reachable"));
    }

    #[test]
    fn test_diagnose_generic() {
        let err = Error::Connection("SSH handshake failed: bad banner".to_string());
        let message = diagnose_connection_error(&err, "ws", 2222);
        assert!(message.contains("ssh -p 2222 ws"));
    }

    #[test]
    fn test_connect_to_closed_port_is_connection_error() {
        // Bind then drop a listener so the port is known to be closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = HostTarget {
            host: "127.0.0.1".to_string(),
            port,
            username: "nobody".to_string(),
            connect_timeout: Duration::from_secs(2),
        };

        let err = SshBackend::new("true")
            .connect(&target, &Secret::new("pw"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection(_)));
        assert!(err.to_string().contains("Troubleshooting suggestions"));
    }
}
