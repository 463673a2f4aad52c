//! SSH transport using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::warn;
use russh::Channel;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{HostKeyVerification, SshSettings};
use crate::credentials::{Credentials, Secret};
use crate::error::TransportError;

type Result<T> = std::result::Result<T, TransportError>;

/// One authenticated SSH connection.
pub struct SshTransport {
    session: Handle<SshHandler>,
    terminal_width: u32,
    terminal_height: u32,
}

impl SshTransport {
    /// Connect to `host` and authenticate, bounded by the login timeout.
    pub async fn connect(
        host: &str,
        settings: &SshSettings,
        credentials: &Credentials,
    ) -> Result<Self> {
        tokio::time::timeout(
            settings.login_timeout,
            Self::establish(host, settings, credentials),
        )
        .await
        .map_err(|_| TransportError::Timeout(settings.login_timeout))?
    }

    async fn establish(
        host: &str,
        settings: &SshSettings,
        credentials: &Credentials,
    ) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(settings.login_timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: host.to_string(),
            port: settings.port,
            host_key_verification: settings.host_key_verification,
            known_hosts_path: settings.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = client::connect(ssh_config, (host, settings.port), handler)
            .await
            .map_err(|e| {
                // Prefer the detailed error check_server_key left behind over
                // the generic russh::Error::UnknownKey.
                let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
                match (stored, e) {
                    (Some(hk_err), _) => hk_err,
                    (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                        host: host.to_string(),
                        port: settings.port,
                        source,
                    },
                    (None, e) => TransportError::Ssh(e),
                }
            })?;

        Self::authenticate(&mut session, credentials).await?;

        Ok(Self {
            session,
            terminal_width: settings.terminal_width,
            terminal_height: settings.terminal_height,
        })
    }

    /// Open a PTY shell channel on this connection.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        let channel = self.session.channel_open_session().await?;

        channel
            .request_pty(
                true,
                "xterm",
                self.terminal_width,
                self.terminal_height,
                0,
                0,
                &[],
            )
            .await?;

        channel.request_shell(true).await?;

        Ok(channel)
    }

    async fn authenticate(session: &mut Handle<SshHandler>, credentials: &Credentials) -> Result<()> {
        let user = credentials.username();
        let success = match credentials.secret() {
            Secret::Password(password) => session
                .authenticate_password(user, password.expose_secret())
                .await?
                .success(),
            Secret::PrivateKey { path, passphrase } => {
                let passphrase = passphrase.as_ref().map(|p| p.expose_secret());
                let key = load_secret_key(path, passphrase)
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session.best_supported_rsa_hash().await?.flatten();

                session
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
                    .await?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: user.to_string(),
            });
        }

        Ok(())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// Host key policy for one connection.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// `Ok(true)` if the key matches known_hosts, `Ok(false)` if the host is
    /// not listed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool> {
        let result = match self.known_hosts_path {
            Some(ref path) => russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<()> {
        let result = match self.known_hosts_path {
            Some(ref path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, err: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(err);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
