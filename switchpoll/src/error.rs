//! Error types for switchpoll.
//!
//! Two families live here. [`Error`] is run-fatal: the inventory could not be
//! read, the configuration is invalid, or the report could not be written.
//! [`DeviceError`] is host-scoped: it is always folded into a failed
//! [`DeviceResult`](crate::model::DeviceResult) and never aborts a run.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Run-fatal error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Inventory could not be loaded
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Invalid run or SSH configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Report could not be written
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Inventory loading errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The inventory source could not be read
    #[error("Failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The inventory contained no hosts
    #[error("Inventory {source_name} contains no hosts")]
    Empty { source_name: String },
}

/// Report sink errors.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Filesystem error while creating the report
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Per-host failure, rendered as `<Kind>: <cause>` in the report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Session could not be established
    #[error("ConnectionError: {0}")]
    Connection(#[from] ConnectionError),

    /// Command could not be executed or was rejected by the device
    #[error("CommandError: {0}")]
    Command(#[from] CommandError),

    /// Output did not match any known structure
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),

    /// A per-host or run deadline expired
    #[error("Timeout: {}", describe_timeout(.stage, .after))]
    Timeout { stage: Stage, after: Duration },

    /// The device task died or left no result behind
    #[error("InternalError: {message}")]
    Internal { message: String },
}

impl DeviceError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            DeviceError::Connection(_) => FailureKind::Connection,
            DeviceError::Command(_) => FailureKind::Command,
            DeviceError::Parse(_) => FailureKind::Parse,
            DeviceError::Timeout { .. } => FailureKind::Timeout,
            DeviceError::Internal { .. } => FailureKind::Internal,
        }
    }

    /// Classify a session command failure, routing its own timeout into the
    /// dedicated timeout bucket.
    pub fn from_command(err: CommandError) -> Self {
        match err {
            CommandError::TimedOut(after) => DeviceError::Timeout {
                stage: Stage::Command,
                after,
            },
            other => DeviceError::Command(other),
        }
    }

    /// Classify a session connect failure, routing its own timeout into the
    /// dedicated timeout bucket.
    pub fn from_connection(err: ConnectionError) -> Self {
        match err {
            ConnectionError::TimedOut(after) => DeviceError::Timeout {
                stage: Stage::Connect,
                after,
            },
            other => DeviceError::Connection(other),
        }
    }
}

fn describe_timeout(stage: &Stage, after: &Duration) -> String {
    match stage {
        Stage::Run => format!(
            "run deadline of {} expired before host completed",
            humanize(*after)
        ),
        stage => format!("{} did not complete within {}", stage, humanize(*after)),
    }
}

fn humanize(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

/// Where in a host's lifecycle a deadline fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connect,
    Command,
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Command => "command",
            Stage::Run => "run",
        };
        f.write_str(name)
    }
}

/// Coarse failure classification used for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connection,
    Command,
    Parse,
    Timeout,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Connection => "ConnectionError",
            FailureKind::Command => "CommandError",
            FailureKind::Parse => "ParseError",
            FailureKind::Timeout => "Timeout",
            FailureKind::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// Session acquisition failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// TCP connect failed (refused, unreachable, DNS)
    #[error("{host} unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// Credentials rejected
    #[error("authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH handshake or protocol negotiation failed
    #[error("SSH negotiation failed: {reason}")]
    Negotiation { reason: String },

    /// Host key unknown (strict mode) or changed
    #[error("host key rejected: {reason}")]
    HostKey { reason: String },

    /// The client gave up waiting for the session
    #[error("connect timed out after {0:?}")]
    TimedOut(Duration),
}

/// Command execution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Device answered with an error marker
    #[error("'{command}' rejected by device: {marker}")]
    Rejected { command: String, marker: String },

    /// Channel closed before the prompt came back
    #[error("channel closed before prompt was seen")]
    ChannelClosed,

    /// Transport-level failure during execution
    #[error("channel failure: {reason}")]
    Channel { reason: String },

    /// Prompt not seen within the command timeout
    #[error("no prompt within {0:?}")]
    TimedOut(Duration),
}

/// Output parser failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace came back
    #[error("empty output")]
    Empty,

    /// No interface block, usage section or table header was found
    #[error("unrecognized output structure starting with {preview:?}")]
    Unrecognized { preview: String },
}

/// SSH transport errors, classified into [`ConnectionError`] or
/// [`CommandError`] depending on when they happen.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host not present in known_hosts under strict checking
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Private key could not be loaded
    #[error("Key error: {0}")]
    Key(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Classify a failure that happened while establishing the session.
    pub fn into_connection_error(self, host: &str) -> ConnectionError {
        match self {
            TransportError::ConnectionFailed { source, .. } => ConnectionError::Unreachable {
                host: host.to_string(),
                reason: source.to_string(),
            },
            TransportError::AuthenticationFailed { user } => {
                ConnectionError::AuthenticationFailed { user }
            }
            e @ (TransportError::HostKeyUnknown { .. }
            | TransportError::HostKeyChanged { .. }
            | TransportError::KnownHosts(_)) => ConnectionError::HostKey {
                reason: e.to_string(),
            },
            TransportError::Timeout(after) => ConnectionError::TimedOut(after),
            e @ (TransportError::Ssh(_)
            | TransportError::Key(_)
            | TransportError::Disconnected) => ConnectionError::Negotiation {
                reason: e.to_string(),
            },
        }
    }

    /// Classify a failure that happened while a command was running.
    pub fn into_command_error(self) -> CommandError {
        match self {
            TransportError::Disconnected => CommandError::ChannelClosed,
            TransportError::Timeout(after) => CommandError::TimedOut(after),
            other => CommandError::Channel {
                reason: other.to_string(),
            },
        }
    }
}

/// Result type alias using switchpoll's run-fatal [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_names_taxonomy_kind() {
        let err = DeviceError::from(ConnectionError::AuthenticationFailed {
            user: "admin".into(),
        });
        assert_eq!(
            err.to_string(),
            "ConnectionError: authentication failed for user 'admin'"
        );
        assert_eq!(err.kind(), FailureKind::Connection);

        let err = DeviceError::from(ParseError::Empty);
        assert!(err.to_string().starts_with("ParseError: "));
    }

    #[test]
    fn test_timeouts_route_to_timeout_kind() {
        let err = DeviceError::from_command(CommandError::TimedOut(Duration::from_secs(5)));
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert_eq!(err.to_string(), "Timeout: command did not complete within 5s");

        let err = DeviceError::from_connection(ConnectionError::TimedOut(Duration::from_millis(
            1500,
        )));
        assert_eq!(err.to_string(), "Timeout: connect did not complete within 1500ms");

        let err = DeviceError::Timeout {
            stage: Stage::Run,
            after: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "Timeout: run deadline of 60s expired before host completed"
        );
    }

    #[test]
    fn test_transport_classification() {
        let err = TransportError::ConnectionFailed {
            host: "sw1".into(),
            port: 22,
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(matches!(
            err.into_connection_error("sw1"),
            ConnectionError::Unreachable { .. }
        ));

        let err = TransportError::HostKeyChanged {
            host: "sw1".into(),
            port: 22,
            line: 7,
        };
        assert!(matches!(
            err.into_connection_error("sw1"),
            ConnectionError::HostKey { .. }
        ));

        assert_eq!(
            TransportError::Disconnected.into_command_error(),
            CommandError::ChannelClosed
        );
    }
}
