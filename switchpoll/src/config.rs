//! Run configuration.
//!
//! [`RunConfig`] is what the engine consumes; it carries no defaults of its
//! own. [`FileConfig`] is the optional TOML file the binary layers its CLI
//! flags over.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::ssh::HostKeyVerification;

/// Longest accepted per-host timeout or run deadline.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 3600);

/// Parameters of one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Command executed on every device.
    pub command: String,

    /// Maximum number of hosts holding a session at once.
    pub concurrency: usize,

    /// Deadline for connect plus command on a single host.
    pub host_timeout: Duration,

    /// Deadline for the whole run; hosts still in flight become timeouts.
    pub run_deadline: Option<Duration>,
}

impl RunConfig {
    /// Reject configurations the dispatcher cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(config_error("command must not be empty"));
        }
        if self.concurrency == 0 {
            return Err(config_error("concurrency must be at least 1"));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(config_error(format!(
                "concurrency must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.host_timeout.is_zero() {
            return Err(config_error("host timeout must be greater than zero"));
        }
        if self.host_timeout > MAX_TIMEOUT {
            return Err(config_error(format!(
                "host timeout must not exceed {}s",
                MAX_TIMEOUT.as_secs()
            )));
        }
        if self.run_deadline.is_some_and(|d| d.is_zero()) {
            return Err(config_error("run deadline must be greater than zero"));
        }
        if self.run_deadline.is_some_and(|d| d > MAX_TIMEOUT) {
            return Err(config_error(format!(
                "run deadline must not exceed {}s",
                MAX_TIMEOUT.as_secs()
            )));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

/// Optional settings file. Every key may be omitted.
///
/// ```toml
/// command = "show port-profile usage"
/// workers = 5
/// host_timeout_secs = 30
/// run_deadline_secs = 600
/// inventory = "inventory/hostnames.txt"
/// output_dir = "output"
///
/// [ssh]
/// username = "netops"
/// port = 22
/// host_key = "accept-new"
/// known_hosts = "/home/netops/.ssh/known_hosts"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub command: Option<String>,
    pub workers: Option<usize>,
    pub host_timeout_secs: Option<u64>,
    pub run_deadline_secs: Option<u64>,
    pub inventory: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub ssh: SshFileConfig,
}

/// `[ssh]` table of the settings file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SshFileConfig {
    pub username: Option<String>,
    pub port: Option<u16>,
    pub host_key: Option<HostKeyVerification>,
    pub known_hosts: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
}

impl FileConfig {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| config_error(e.to_string()))
    }

    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig {
            command: "show port-profile usage".into(),
            concurrency: 5,
            host_timeout: Duration::from_secs(30),
            run_deadline: None,
        }
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.concurrency = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.command = "  ".into();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.run_deadline = Some(Duration::ZERO);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_limits() {
        let mut bad = config();
        bad.host_timeout = Duration::from_secs(u64::MAX);
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("host timeout must not exceed"));

        let mut bad = config();
        bad.run_deadline = Some(MAX_TIMEOUT + Duration::from_secs(1));
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.concurrency = usize::MAX;
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency must not exceed"));

        let mut edge = config();
        edge.host_timeout = MAX_TIMEOUT;
        edge.run_deadline = Some(MAX_TIMEOUT);
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_file_config_parses() {
        let file = FileConfig::from_toml(
            r#"
            command = "show running-config interface"
            workers = 10
            run_deadline_secs = 120

            [ssh]
            port = 2222
            host_key = "strict"
            "#,
        )
        .unwrap();

        assert_eq!(file.command.as_deref(), Some("show running-config interface"));
        assert_eq!(file.workers, Some(10));
        assert_eq!(file.host_timeout_secs, None);
        assert_eq!(file.ssh.port, Some(2222));
        assert_eq!(file.ssh.host_key, Some(HostKeyVerification::Strict));
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(FileConfig::from_toml("wokers = 3").is_err());
    }
}
