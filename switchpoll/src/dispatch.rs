//! Fleet-wide fan-out.
//!
//! [`FleetDispatcher`] spawns one tokio task per inventory host, bounds the
//! number of hosts holding a session with a semaphore, and collects exactly one
//! [`DeviceResult`] per host. A result slot per host is reserved before any task
//! starts; only the collecting loop writes to it, once per host.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::RunConfig;
use crate::credentials::Credentials;
use crate::error::{DeviceError, Stage};
use crate::events::{Event, EventSink, LogSink};
use crate::model::{DeviceResult, DeviceStatus, Host};
use crate::session::SessionClient;
use crate::task::DeviceTask;

type Slots = Vec<Option<DeviceResult>>;

/// Runs device tasks for a whole inventory.
pub struct FleetDispatcher<C> {
    client: Arc<C>,
    credentials: Arc<Credentials>,
    config: Arc<RunConfig>,
    sink: Arc<dyn EventSink>,
}

impl<C: SessionClient> FleetDispatcher<C> {
    /// Create a dispatcher that reports through the `log` facade.
    pub fn new(client: C, credentials: Credentials, config: RunConfig) -> Self {
        Self {
            client: Arc::new(client),
            credentials: Arc::new(credentials),
            config: Arc::new(config),
            sink: Arc::new(LogSink),
        }
    }

    /// Report events to `sink` instead.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The session client shared by all tasks.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Poll every host and return one result per host, in inventory order.
    ///
    /// Completion order does not matter and no host's failure affects another.
    /// If the run deadline expires, unfinished tasks are aborted, which drops
    /// and thereby closes their sessions, and their hosts are recorded as
    /// timeouts.
    pub async fn run(&self, hosts: &[Host]) -> Vec<DeviceResult> {
        let mut slots: Slots = (0..hosts.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();
        let permits = Arc::new(Semaphore::new(
            self.config.concurrency.min(Semaphore::MAX_PERMITS),
        ));

        for (index, host) in hosts.iter().cloned().enumerate() {
            let client = self.client.clone();
            let credentials = self.credentials.clone();
            let config = self.config.clone();
            let sink = self.sink.clone();
            let permits = permits.clone();

            tasks.spawn(async move {
                // Held until the task ends, so it covers connect through close.
                let Ok(_permit) = permits.acquire_owned().await else {
                    let err = DeviceError::Internal {
                        message: "worker pool closed".into(),
                    };
                    return (index, DeviceResult::failed(host, err));
                };

                let task = DeviceTask {
                    client: client.as_ref(),
                    credentials: credentials.as_ref(),
                    command: &config.command,
                    host_timeout: config.host_timeout,
                    sink: sink.as_ref(),
                };
                let result = match AssertUnwindSafe(task.run(&host)).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        let err = DeviceError::Internal {
                            message: format!("device task panicked: {}", message),
                        };
                        sink.emit(&Event::HostComplete {
                            host: &host,
                            status: DeviceStatus::Failed,
                            records: 0,
                            error: Some(&err),
                        });
                        DeviceResult::failed(host, err)
                    }
                };
                (index, result)
            });
        }

        let expired = match self.config.run_deadline {
            Some(deadline) => {
                let drained = tokio::time::timeout(deadline, drain(&mut tasks, &mut slots)).await;
                if drained.is_err() {
                    // Keep anything that finished while we were giving up.
                    tasks.abort_all();
                    drain(&mut tasks, &mut slots).await;
                }
                drained.is_err().then_some(deadline)
            }
            None => {
                drain(&mut tasks, &mut slots).await;
                None
            }
        };

        let results: Vec<DeviceResult> = slots
            .into_iter()
            .zip(hosts)
            .map(|(slot, host)| slot.unwrap_or_else(|| self.unfinished(host, expired)))
            .collect();

        let successful = results.iter().filter(|r| r.is_success()).count();
        self.sink.emit(&Event::RunComplete {
            successful,
            failed: results.len() - successful,
        });
        results
    }

    /// Result for a host whose task never reported back.
    fn unfinished(&self, host: &Host, expired: Option<Duration>) -> DeviceResult {
        let err = match expired {
            Some(deadline) => {
                self.sink.emit(&Event::HostAbandoned { host, deadline });
                DeviceError::Timeout {
                    stage: Stage::Run,
                    after: deadline,
                }
            }
            None => DeviceError::Internal {
                message: "device task ended without a result".into(),
            },
        };
        DeviceResult::failed(host.clone(), err)
    }
}

/// Move finished task results into their slots until the set is empty.
async fn drain(tasks: &mut JoinSet<(usize, DeviceResult)>, slots: &mut Slots) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => {
                debug_assert!(slots[index].is_none(), "slot {} written twice", index);
                slots[index] = Some(result);
            }
            Err(e) if e.is_cancelled() => debug!("device task cancelled"),
            Err(e) => warn!("device task failed to join: {}", e),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
