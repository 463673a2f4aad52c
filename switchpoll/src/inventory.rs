//! Host inventory loading.

use std::path::Path;

use crate::error::{InventoryError, Result};
use crate::model::Host;

/// Ordered list of hosts to poll. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    hosts: Vec<Host>,
}

impl Inventory {
    /// Parse line-delimited hosts. Surrounding whitespace is trimmed; blank
    /// lines and `#` comments are ignored; duplicates are kept.
    pub fn parse(text: &str, source_name: &str) -> Result<Self> {
        let hosts: Vec<Host> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Host::new)
            .collect();

        if hosts.is_empty() {
            return Err(InventoryError::Empty {
                source_name: source_name.to_string(),
            }
            .into());
        }
        Ok(Self { hosts })
    }

    /// Read an inventory file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let inv = Inventory::parse(
            "sw1.example.net\n\n  10.0.0.2  \n# spare\nsw1.example.net\n",
            "hosts",
        )
        .unwrap();
        let names: Vec<_> = inv.hosts().iter().map(Host::as_str).collect();
        assert_eq!(names, vec!["sw1.example.net", "10.0.0.2", "sw1.example.net"]);
    }

    #[test]
    fn test_empty_inventory_is_fatal() {
        let err = Inventory::parse("\n   \n# nothing\n", "hostnames.txt").unwrap_err();
        assert!(matches!(
            err,
            Error::Inventory(InventoryError::Empty { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = Inventory::load(Path::new("/nonexistent/hostnames.txt")).unwrap_err();
        assert!(matches!(err, Error::Inventory(InventoryError::Read { .. })));
    }
}
