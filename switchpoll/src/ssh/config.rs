//! SSH connection settings shared by every host in a run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

impl FromStr for HostKeyVerification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "accept-new" => Ok(Self::AcceptNew),
            "disabled" | "off" => Ok(Self::Disabled),
            other => Err(format!(
                "unknown host key mode '{}' (expected strict, accept-new or disabled)",
                other
            )),
        }
    }
}

impl fmt::Display for HostKeyVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::AcceptNew => f.write_str("accept-new"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// Per-run SSH settings. Hostnames and credentials come from elsewhere.
#[derive(Debug, Clone)]
pub struct SshSettings {
    /// SSH port (default: 22).
    pub port: u16,

    /// Bound on TCP connect, authentication and the first prompt.
    pub login_timeout: Duration,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    pub terminal_height: u32,

    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; the user's default when unset.
    pub known_hosts_path: Option<PathBuf>,

    /// How many bytes from the end of the output to search for the prompt.
    pub search_depth: usize,
}

impl SshSettings {
    pub fn new(login_timeout: Duration) -> Self {
        Self {
            port: 22,
            login_timeout,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            search_depth: 1000,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn with_known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }
}
