//! One device's collection lifecycle.
//!
//! [`DeviceTask::run`] is the failure boundary of the engine: whatever the
//! session client or the parser does, it comes back as a [`DeviceResult`].

use std::time::Duration;

use log::debug;
use tokio::time::{Instant, timeout, timeout_at};

use crate::credentials::Credentials;
use crate::error::{DeviceError, Stage};
use crate::events::{Event, EventSink};
use crate::model::{DeviceResult, Host, InterfaceRecord, RawCommandOutput};
use crate::parser;
use crate::session::{Session, SessionClient, deadline_in};

/// Upper bound on a graceful close once the work is done.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Everything a device task needs besides the host itself.
pub struct DeviceTask<'a, C> {
    pub client: &'a C,
    pub credentials: &'a Credentials,
    pub command: &'a str,

    /// Deadline for connect plus execute on this host.
    pub host_timeout: Duration,

    pub sink: &'a dyn EventSink,
}

impl<C: SessionClient> DeviceTask<'_, C> {
    /// Poll one host. Never fails; faults become a failed result.
    pub async fn run(&self, host: &Host) -> DeviceResult {
        let result = match self.collect(host).await {
            Ok(records) => DeviceResult::success(host.clone(), records),
            Err(err) => DeviceResult::failed(host.clone(), err),
        };

        self.sink.emit(&Event::HostComplete {
            host,
            status: result.status(),
            records: result.records().len(),
            error: result.error(),
        });
        result
    }

    async fn collect(&self, host: &Host) -> Result<Vec<InterfaceRecord>, DeviceError> {
        let started = Instant::now();
        let deadline = deadline_in(self.host_timeout);

        self.sink.emit(&Event::ConnectAttempt { host });
        let mut session = timeout_at(deadline, self.client.connect(host, self.credentials))
            .await
            .map_err(|_| DeviceError::Timeout {
                stage: Stage::Connect,
                after: self.host_timeout,
            })?
            .map_err(DeviceError::from_connection)?;
        self.sink.emit(&Event::Connected {
            host,
            elapsed: started.elapsed(),
        });

        let remaining = deadline.saturating_duration_since(Instant::now());
        let executed = timeout_at(deadline, session.execute(self.command, remaining)).await;

        if timeout(CLOSE_GRACE, session.close()).await.is_err() {
            debug!("{}: close did not finish within {:?}", host, CLOSE_GRACE);
        }

        let text = executed
            .map_err(|_| DeviceError::Timeout {
                stage: Stage::Command,
                after: self.host_timeout,
            })?
            .map_err(DeviceError::from_command)?;

        let raw = RawCommandOutput {
            host: host.clone(),
            command: self.command.to_string(),
            text,
        };
        self.parse(&raw)
    }

    fn parse(&self, raw: &RawCommandOutput) -> Result<Vec<InterfaceRecord>, DeviceError> {
        let outcome = parser::parse(&raw.text)?;
        for entry in &outcome.skipped {
            self.sink.emit(&Event::ParseSkip {
                host: &raw.host,
                entry,
            });
        }
        debug!(
            "{}: '{}' yielded {} record(s), {} skipped",
            raw.host,
            raw.command,
            outcome.records.len(),
            outcome.skipped.len()
        );
        Ok(outcome.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandError, ConnectionError, FailureKind};
    use crate::events::testing::RecordingSink;
    use crate::model::DeviceStatus;
    use crate::testing::{Behavior, ScriptedClient};

    const USAGE: &str = "port-profile SERVERS\n Ethernet1/1\n Ethernet1/2\n";

    fn task<'a>(
        client: &'a ScriptedClient,
        creds: &'a Credentials,
        sink: &'a RecordingSink,
    ) -> DeviceTask<'a, ScriptedClient> {
        DeviceTask {
            client,
            credentials: creds,
            command: "show port-profile usage",
            host_timeout: Duration::from_secs(10),
            sink,
        }
    }

    #[tokio::test]
    async fn test_success_parses_records() {
        let client = ScriptedClient::new().with("sw1", Behavior::Output(USAGE.into()));
        let creds = Credentials::password("admin", "pw");
        let sink = RecordingSink::default();

        let result = task(&client, &creds, &sink).run(&Host::new("sw1")).await;
        assert_eq!(result.status(), DeviceStatus::Success);
        assert_eq!(result.records().len(), 2);
        assert_eq!(
            sink.lines(),
            vec!["connect sw1", "connected sw1", "complete sw1 Success"]
        );
        assert_eq!(client.closed(), 1);
    }

    #[tokio::test]
    async fn test_each_fault_is_classified() {
        let client = ScriptedClient::new()
            .with(
                "refused",
                Behavior::ConnectError(ConnectionError::Unreachable {
                    host: "refused".into(),
                    reason: "connection refused".into(),
                }),
            )
            .with(
                "rejected",
                Behavior::CommandError(CommandError::Rejected {
                    command: "show port-profile usage".into(),
                    marker: "% Invalid command".into(),
                }),
            )
            .with("garbage", Behavior::Output("$$$ nonsense $$$".into()));
        let creds = Credentials::password("admin", "pw");
        let sink = RecordingSink::default();
        let task = task(&client, &creds, &sink);

        let kinds: Vec<_> = [
            task.run(&Host::new("refused")).await,
            task.run(&Host::new("rejected")).await,
            task.run(&Host::new("garbage")).await,
        ]
        .iter()
        .map(|r| r.error().map(|e| e.kind()))
        .collect();

        assert_eq!(
            kinds,
            vec![
                Some(FailureKind::Connection),
                Some(FailureKind::Command),
                Some(FailureKind::Parse),
            ]
        );
        // Sessions that were opened are closed even when the command fails.
        assert_eq!(client.closed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_timeout_during_command() {
        let client =
            ScriptedClient::new().with("slow", Behavior::Stall(Duration::from_secs(3600)));
        let creds = Credentials::password("admin", "pw");
        let sink = RecordingSink::default();

        let result = task(&client, &creds, &sink).run(&Host::new("slow")).await;
        let err = result.error().unwrap();
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert!(err.to_string().contains("command did not complete within 10s"));
        assert_eq!(client.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_timeout_during_connect() {
        let client =
            ScriptedClient::new().with("hung", Behavior::ConnectStall(Duration::from_secs(3600)));
        let creds = Credentials::password("admin", "pw");
        let sink = RecordingSink::default();

        let result = task(&client, &creds, &sink).run(&Host::new("hung")).await;
        let err = result.error().unwrap();
        assert_eq!(
            err,
            &DeviceError::Timeout {
                stage: Stage::Connect,
                after: Duration::from_secs(10)
            }
        );
        assert_eq!(
            err.to_string(),
            "Timeout: connect did not complete within 10s"
        );
        assert_eq!(client.connects(), 1);
        // No session was handed out, so there is nothing to close.
        assert_eq!(client.closed(), 0);
        assert_eq!(sink.lines(), vec!["connect hung", "complete hung Failed"]);
    }

    #[tokio::test]
    async fn test_unbounded_host_timeout_does_not_overflow() {
        let client = ScriptedClient::new().with("sw1", Behavior::Output(USAGE.into()));
        let creds = Credentials::password("admin", "pw");
        let sink = RecordingSink::default();
        let task = DeviceTask {
            host_timeout: Duration::from_secs(u64::MAX),
            ..task(&client, &creds, &sink)
        };

        let result = task.run(&Host::new("sw1")).await;
        assert!(result.is_success());
        assert_eq!(result.records().len(), 2);
    }

    #[tokio::test]
    async fn test_parse_skips_are_reported() {
        let client = ScriptedClient::new().with(
            "sw1",
            Behavior::Output("interface Ethernet1/1\ninterface ???\n".into()),
        );
        let creds = Credentials::password("admin", "pw");
        let sink = RecordingSink::default();

        let result = task(&client, &creds, &sink).run(&Host::new("sw1")).await;
        assert!(result.is_success());
        assert!(sink.lines().contains(&"skip sw1 line 2".to_string()));
    }
}
