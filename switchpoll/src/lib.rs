//! # Switchpoll
//!
//! Concurrent port-profile collector for NX-OS switch fleets.
//!
//! Switchpoll logs in to every switch of an inventory over SSH, runs one
//! show command, parses the per-interface port-profile assignments out of the
//! text and writes a single CSV report with one row per interface (or one row
//! per failed host).
//!
//! ## Features
//!
//! - Bounded fan-out over tokio tasks; one result per inventory host
//! - Per-host and whole-run deadlines
//! - Host-scoped failures that never abort the run
//! - Lenient parser for interface blocks, usage sections and tables
//! - Deterministic CSV report in inventory order
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use switchpoll::{Credentials, FleetDispatcher, Inventory, RunConfig, SshClient, SshSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchpoll::Error> {
//!     let inventory = Inventory::load("inventory/hostnames.txt".as_ref())?;
//!     let config = RunConfig {
//!         command: "show port-profile usage".into(),
//!         concurrency: 5,
//!         host_timeout: Duration::from_secs(30),
//!         run_deadline: None,
//!     };
//!     config.validate()?;
//!
//!     let client = SshClient::new(SshSettings::new(config.host_timeout));
//!     let credentials = Credentials::password("admin", "secret");
//!     let dispatcher = FleetDispatcher::new(client, credentials, config);
//!
//!     let results = dispatcher.run(inventory.hosts()).await;
//!     let report = switchpoll::aggregate(inventory.hosts(), &results);
//!     println!("{} rows", report.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod inventory;
pub mod model;
pub mod parser;
pub mod report;
pub mod session;
pub mod ssh;
pub mod task;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use config::{FileConfig, RunConfig};
pub use credentials::Credentials;
pub use dispatch::FleetDispatcher;
pub use error::{DeviceError, Error, FailureKind, Result};
pub use events::{Event, EventSink, LogSink, NullSink};
pub use inventory::Inventory;
pub use model::{DeviceResult, DeviceStatus, Host, InterfaceRecord, Outcome, RawCommandOutput};
pub use report::csv::CsvReportSink;
pub use report::{Report, ReportRow, Summary, aggregate};
pub use session::{Session, SessionClient};
pub use ssh::{HostKeyVerification, SshClient, SshSettings};
