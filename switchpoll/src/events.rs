//! Structured run events.
//!
//! Components never log through ambient state on their own; they report what
//! happened to an [`EventSink`] handed to them. [`LogSink`] forwards events to
//! the `log` facade, [`NullSink`] drops them.

use std::time::Duration;

use log::{debug, info, warn};

use crate::error::DeviceError;
use crate::model::{DeviceStatus, Host};
use crate::parser::SkippedEntry;

/// Something observable happened during a run.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A device task is about to open a session.
    ConnectAttempt { host: &'a Host },

    /// The session is up.
    Connected { host: &'a Host, elapsed: Duration },

    /// The parser dropped an entry from this host's output.
    ParseSkip {
        host: &'a Host,
        entry: &'a SkippedEntry,
    },

    /// A device task produced its result.
    HostComplete {
        host: &'a Host,
        status: DeviceStatus,
        records: usize,
        error: Option<&'a DeviceError>,
    },

    /// The run deadline fired before this host finished.
    HostAbandoned { host: &'a Host, deadline: Duration },

    /// Every host has a result.
    RunComplete { successful: usize, failed: usize },
}

/// Receiver for run events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event<'_>);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &Event<'_>) {
        match *event {
            Event::ConnectAttempt { host } => info!("{}: connecting", host),
            Event::Connected { host, elapsed } => debug!("{}: connected in {:?}", host, elapsed),
            Event::ParseSkip { host, entry } => debug!(
                "{}: skipped line {} ({}): {:?}",
                host, entry.line, entry.reason, entry.text
            ),
            Event::HostComplete {
                host,
                records,
                error: None,
                ..
            } => info!("{}: collected {} interface(s)", host, records),
            Event::HostComplete {
                host,
                error: Some(err),
                ..
            } => warn!("{}: {}", host, err),
            Event::HostAbandoned { host, deadline } => {
                warn!("{}: abandoned after run deadline of {:?}", host, deadline)
            }
            Event::RunComplete { successful, failed } => {
                info!("Summary: {} successful, {} failed", successful, failed)
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &Event<'_>) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Keeps a one-line rendering of every event for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &Event<'_>) {
            let line = match *event {
                Event::ConnectAttempt { host } => format!("connect {}", host),
                Event::Connected { host, .. } => format!("connected {}", host),
                Event::ParseSkip { host, entry } => format!("skip {} line {}", host, entry.line),
                Event::HostComplete { host, status, .. } => format!("complete {} {}", host, status),
                Event::HostAbandoned { host, .. } => format!("abandoned {}", host),
                Event::RunComplete { successful, failed } => {
                    format!("run {} ok {} failed", successful, failed)
                }
            };
            self.lines.lock().unwrap().push(line);
        }
    }
}
