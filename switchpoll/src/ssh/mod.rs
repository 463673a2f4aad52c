//! SSH session client for NX-OS switches.
//!
//! [`SshClient`] logs in over an interactive PTY shell, waits for the first
//! prompt and runs the platform's on-open commands (paging off, wide
//! terminal). [`SshSession::execute`] sends one command and reads until the
//! prompt comes back.

mod buffer;
pub mod config;
pub mod platform;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::Instant;

pub use buffer::PatternBuffer;
pub use config::{HostKeyVerification, SshSettings};
pub use platform::Platform;
pub use transport::SshTransport;

use crate::credentials::Credentials;
use crate::error::{CommandError, ConnectionError, TransportError};
use crate::model::Host;
use crate::session::{Session, SessionClient, deadline_in};

/// Opens NX-OS shell sessions.
#[derive(Debug, Clone)]
pub struct SshClient {
    settings: SshSettings,
    platform: Arc<Platform>,
}

impl SshClient {
    pub fn new(settings: SshSettings) -> Self {
        Self {
            settings,
            platform: Arc::new(platform::nxos()),
        }
    }

    /// Log in and wait for the first prompt.
    async fn open(
        &self,
        host: &Host,
        credentials: &Credentials,
    ) -> Result<SshSession, TransportError> {
        let transport = SshTransport::connect(host.as_str(), &self.settings, credentials).await?;
        let channel = transport.open_channel().await?;

        let mut session = SshSession {
            transport,
            channel,
            buffer: PatternBuffer::new(self.settings.search_depth),
            platform: self.platform.clone(),
        };

        let timeout = self.settings.login_timeout;
        session
            .read_until_prompt(deadline_in(timeout), timeout)
            .await?;
        Ok(session)
    }
}

impl SessionClient for SshClient {
    type Session = SshSession;

    async fn connect(
        &self,
        host: &Host,
        credentials: &Credentials,
    ) -> Result<SshSession, ConnectionError> {
        let mut session = self
            .open(host, credentials)
            .await
            .map_err(|e| e.into_connection_error(host.as_str()))?;

        let platform = self.platform.clone();
        for command in &platform.on_open_commands {
            match session.execute(command, self.settings.login_timeout).await {
                Ok(_) => {}
                Err(CommandError::Rejected { marker, .. }) => {
                    warn!("{}: '{}' rejected ({}), continuing", host, command, marker);
                }
                Err(e) => {
                    session.close().await;
                    return Err(match e {
                        CommandError::TimedOut(after) => ConnectionError::TimedOut(after),
                        other => ConnectionError::Negotiation {
                            reason: format!("'{}' failed: {}", command, other),
                        },
                    });
                }
            }
        }

        debug!("{}: {} session ready", host, platform.name);
        Ok(session)
    }
}

/// An interactive shell on one switch. Dropping it drops the SSH connection.
pub struct SshSession {
    transport: SshTransport,
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    platform: Arc<Platform>,
}

impl SshSession {
    /// Read channel data until the prompt shows up in the tail of the buffer.
    async fn read_until_prompt(
        &mut self,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        loop {
            if self.buffer.tail_contains(&self.platform.prompt) {
                return Ok(self.buffer.take());
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| TransportError::Timeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => self.buffer.extend(&data),
                Some(ChannelMsg::ExtendedData { data, .. }) => self.buffer.extend(&data),
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                    return Err(TransportError::Disconnected);
                }
                Some(_) => {}
            }
        }
    }
}

impl Session for SshSession {
    async fn execute(&mut self, command: &str, timeout: Duration) -> Result<String, CommandError> {
        let deadline = deadline_in(timeout);

        // Anything left over belongs to the previous exchange.
        self.buffer.take();

        let line = format!("{}\n", command);
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(|e| TransportError::Ssh(e).into_command_error())?;

        let raw = self
            .read_until_prompt(deadline, timeout)
            .await
            .map_err(TransportError::into_command_error)?;

        let raw = String::from_utf8_lossy(&raw);
        let output = self.platform.normalize_output(&raw, command);

        if let Some(marker) = self.platform.detect_failure(&output) {
            return Err(CommandError::Rejected {
                command: command.to_string(),
                marker: marker.to_string(),
            });
        }

        Ok(output)
    }

    async fn close(self) {
        if let Err(e) = self.transport.close().await {
            debug!("SSH disconnect failed: {}", e);
        }
    }
}
