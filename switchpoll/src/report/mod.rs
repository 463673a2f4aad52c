//! Report aggregation.
//!
//! [`aggregate`] flattens per-device results into rows in inventory order. It
//! is a pure function: the same hosts and results always give the same rows.

pub mod csv;

use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::error::{DeviceError, FailureKind};
use crate::model::{DeviceResult, DeviceStatus, Host, InterfaceRecord};

/// Column titles, in row order.
pub const HEADER: [&str; 7] = [
    "Host",
    "Status",
    "Interface",
    "Port_Profile",
    "VLAN",
    "Description",
    "Error",
];

/// One report line. Absent values render as blank cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub host: String,
    pub status: DeviceStatus,
    pub interface: Option<String>,
    pub port_profile: Option<String>,
    pub vlan: Option<String>,
    pub description: Option<String>,
    pub error: Option<String>,
}

impl ReportRow {
    fn interface(host: &Host, record: &InterfaceRecord) -> Self {
        Self {
            host: host.to_string(),
            status: DeviceStatus::Success,
            interface: Some(record.interface.clone()),
            port_profile: record.port_profile.clone(),
            vlan: record.vlan.clone(),
            description: record.description.clone(),
            error: None,
        }
    }

    fn placeholder(host: &Host, status: DeviceStatus, error: Option<&DeviceError>) -> Self {
        Self {
            host: host.to_string(),
            status,
            interface: None,
            port_profile: None,
            vlan: None,
            description: None,
            error: error.map(ToString::to_string),
        }
    }

    /// Cells in [`HEADER`] order.
    pub fn cells(&self) -> [String; 7] {
        let blank = |v: &Option<String>| v.clone().unwrap_or_default();
        [
            self.host.clone(),
            self.status.to_string(),
            blank(&self.interface),
            blank(&self.port_profile),
            blank(&self.vlan),
            blank(&self.description),
            blank(&self.error),
        ]
    }
}

/// Host counts for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub successful: usize,
    pub failed: usize,

    /// Failed hosts per error kind, in the order kinds were first seen.
    pub failures: IndexMap<FailureKind, usize>,
}

impl Summary {
    fn record(&mut self, result: &DeviceResult) {
        match result.error() {
            None => self.successful += 1,
            Some(err) => {
                self.failed += 1;
                *self.failures.entry(err.kind()).or_default() += 1;
            }
        }
    }
}

/// The merged report of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    rows: Vec<ReportRow>,
    summary: Summary,
}

impl Report {
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Merge device results into report rows following the order of `hosts`.
///
/// Results are matched to hosts by name; a host listed twice consumes its
/// results in the order they were given. A host without a result still gets a
/// failed row, so every listed host appears at least once.
pub fn aggregate(hosts: &[Host], results: &[DeviceResult]) -> Report {
    let mut by_host: IndexMap<&Host, VecDeque<&DeviceResult>> = IndexMap::new();
    for result in results {
        by_host.entry(&result.host).or_default().push_back(result);
    }

    let mut report = Report::default();
    for host in hosts {
        let missing;
        let result = match by_host.get_mut(host).and_then(VecDeque::pop_front) {
            Some(result) => result,
            None => {
                missing = DeviceResult::failed(
                    host.clone(),
                    DeviceError::Internal {
                        message: "no result recorded for host".into(),
                    },
                );
                &missing
            }
        };

        report.summary.record(result);
        let records = result.records();
        if records.is_empty() {
            report
                .rows
                .push(ReportRow::placeholder(host, result.status(), result.error()));
        } else {
            report
                .rows
                .extend(records.iter().map(|record| ReportRow::interface(host, record)));
        }
    }
    report
}
