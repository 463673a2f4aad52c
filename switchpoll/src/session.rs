//! The device session seam.
//!
//! The collection engine only needs three operations from a remote shell:
//! connect, execute, close. [`SshClient`](crate::ssh::SshClient) provides them
//! over SSH; tests provide scripted in-memory clients.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::credentials::Credentials;
use crate::error::{CommandError, ConnectionError};
use crate::model::Host;

/// Opens sessions to devices.
pub trait SessionClient: Send + Sync + 'static {
    type Session: Session;

    /// Open an authenticated shell on `host`.
    fn connect(
        &self,
        host: &Host,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session, ConnectionError>> + Send;
}

/// An open shell on one device.
///
/// Dropping a session without calling [`close`](Session::close) must still
/// release it; the dispatcher relies on this when it abandons tasks at the run
/// deadline.
pub trait Session: Send + 'static {
    /// Run one command and return its output with echo and prompt removed.
    fn execute(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, CommandError>> + Send;

    /// Close the session gracefully.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Stand-in for "no deadline" when `now + timeout` does not fit in an
/// [`Instant`]; about 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// The instant `timeout` from now, saturating instead of overflowing.
pub fn deadline_in(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_in_saturates() {
        let before = Instant::now();
        let far = deadline_in(Duration::from_secs(u64::MAX));
        assert!(far > before + Duration::from_secs(86400));
        assert!(deadline_in(Duration::from_secs(5)) >= before + Duration::from_secs(5));
    }
}
