//! Scripted in-memory session client for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::{CommandError, ConnectionError};
use crate::model::Host;
use crate::session::{Session, SessionClient};

/// What a scripted host does.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Connect succeeds and the command returns this text.
    Output(String),
    ConnectError(ConnectionError),
    CommandError(CommandError),
    /// Connect succeeds, the command never answers within this long.
    Stall(Duration),
    /// Connect itself hangs this long.
    ConnectStall(Duration),
    /// The command panics.
    Panic,
}

#[derive(Debug, Default)]
struct Counters {
    open: AtomicUsize,
    peak: AtomicUsize,
    closed: AtomicUsize,
    connects: AtomicUsize,
}

/// Session client driven by a per-host script. Counts concurrently open
/// sessions so tests can check the concurrency limit.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: HashMap<String, Behavior>,
    latency: Duration,
    counters: Arc<Counters>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, host: &str, behavior: Behavior) -> Self {
        self.script.insert(host.to_string(), behavior);
        self
    }

    /// Delay every successful command by this much.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Highest number of sessions that were open at the same time.
    pub fn peak_open(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn open_now(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    /// Sessions closed explicitly through [`Session::close`].
    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }
}

impl SessionClient for ScriptedClient {
    type Session = ScriptedSession;

    async fn connect(
        &self,
        host: &Host,
        _credentials: &Credentials,
    ) -> Result<ScriptedSession, ConnectionError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        let behavior = self.script.get(host.as_str()).cloned().unwrap_or_else(|| {
            Behavior::ConnectError(ConnectionError::Unreachable {
                host: host.to_string(),
                reason: "not scripted".into(),
            })
        });

        match behavior {
            Behavior::ConnectError(err) => return Err(err),
            Behavior::ConnectStall(d) => {
                tokio::time::sleep(d).await;
                return Err(ConnectionError::TimedOut(d));
            }
            _ => {}
        }

        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(open, Ordering::SeqCst);
        Ok(ScriptedSession {
            behavior,
            latency: self.latency,
            counters: self.counters.clone(),
        })
    }
}

pub struct ScriptedSession {
    behavior: Behavior,
    latency: Duration,
    counters: Arc<Counters>,
}

impl Session for ScriptedSession {
    async fn execute(&mut self, _command: &str, _timeout: Duration) -> Result<String, CommandError> {
        match &self.behavior {
            Behavior::Output(text) => {
                tokio::time::sleep(self.latency).await;
                Ok(text.clone())
            }
            Behavior::CommandError(err) => Err(err.clone()),
            Behavior::Stall(d) => {
                tokio::time::sleep(*d).await;
                Err(CommandError::TimedOut(*d))
            }
            Behavior::Panic => panic!("scripted panic"),
            Behavior::ConnectError(_) | Behavior::ConnectStall(_) => {
                unreachable!("connect failures never yield a session")
            }
        }
    }

    async fn close(self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
    }
}
