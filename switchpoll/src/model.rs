//! Records that flow from the device tasks to the report.

use std::fmt;

use crate::error::DeviceError;

/// A device identifier from the inventory (hostname or IP address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Host(String);

impl Host {
    /// Create a host from an inventory entry.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The hostname or address as written in the inventory.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Host {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Raw text returned by one device for one command.
#[derive(Debug, Clone)]
pub struct RawCommandOutput {
    /// Device the output came from.
    pub host: Host,

    /// Command that produced it.
    pub command: String,

    /// Output with command echo and trailing prompt removed.
    pub text: String,
}

/// Port-profile state of a single interface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceRecord {
    /// Interface name as the device prints it (e.g. `Ethernet1/1`).
    pub interface: String,

    /// Inherited port-profile, if any.
    pub port_profile: Option<String>,

    /// Access VLAN, if reported.
    pub vlan: Option<String>,

    /// Interface description, if configured.
    pub description: Option<String>,
}

impl InterfaceRecord {
    /// Create a record with no optional fields set.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    pub fn with_port_profile(mut self, profile: impl Into<String>) -> Self {
        self.port_profile = Some(profile.into());
        self
    }

    pub fn with_vlan(mut self, vlan: impl Into<String>) -> Self {
        self.vlan = Some(vlan.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Whether a device was polled successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Success,
    Failed,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Success => f.write_str("Success"),
            DeviceStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// What a device task ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Records in device output order; may be empty.
    Success(Vec<InterfaceRecord>),

    /// Classified failure.
    Failed(DeviceError),
}

/// The single result a device task produces for its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResult {
    pub host: Host,
    pub outcome: Outcome,
}

impl DeviceResult {
    pub fn success(host: Host, records: Vec<InterfaceRecord>) -> Self {
        Self {
            host,
            outcome: Outcome::Success(records),
        }
    }

    pub fn failed(host: Host, error: DeviceError) -> Self {
        Self {
            host,
            outcome: Outcome::Failed(error),
        }
    }

    pub fn status(&self) -> DeviceStatus {
        match self.outcome {
            Outcome::Success(_) => DeviceStatus::Success,
            Outcome::Failed(_) => DeviceStatus::Failed,
        }
    }

    /// Parsed records; empty for a failed device.
    pub fn records(&self) -> &[InterfaceRecord] {
        match &self.outcome {
            Outcome::Success(records) => records,
            Outcome::Failed(_) => &[],
        }
    }

    /// The failure, present iff the device failed.
    pub fn error(&self) -> Option<&DeviceError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failed(err) => Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == DeviceStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    #[test]
    fn test_failed_result_has_error_and_no_records() {
        let result = DeviceResult::failed(Host::new("sw1"), ParseError::Empty.into());
        assert_eq!(result.status(), DeviceStatus::Failed);
        assert!(result.records().is_empty());
        assert!(result.error().is_some());
    }

    #[test]
    fn test_success_result_keeps_record_order() {
        let records = vec![
            InterfaceRecord::new("Ethernet1/2").with_port_profile("B"),
            InterfaceRecord::new("Ethernet1/1").with_port_profile("A"),
        ];
        let result = DeviceResult::success(Host::new("sw1"), records);
        assert!(result.is_success());
        assert!(result.error().is_none());
        assert_eq!(result.records()[0].interface, "Ethernet1/2");
        assert_eq!(result.records()[1].interface, "Ethernet1/1");
    }
}
