//! Port-profile output parser.
//!
//! Turns the text one NX-OS device returned into [`InterfaceRecord`]s. Three
//! layouts are understood, and may be mixed in one output:
//!
//! ```text
//! interface Ethernet1/1                 # running-config style block
//!   description web-01
//!   inherit port-profile SERVERS
//!   switchport access vlan 100
//!
//! Ethernet1/2 is up                     # show interface style block
//!   Port-Profile: SERVERS
//!   Description: web-02
//!
//! port-profile UPLINKS                  # show port-profile usage section
//!  Ethernet1/49
//!  port-channel10
//!
//! Interface   Port-Profile  VLAN  Description    # tabular output
//! ---------   ------------  ----  -----------
//! Eth1/3      SERVERS       100   web-03 rack 4
//! ```
//!
//! Parsing is lenient per entry and strict on the whole: an entry whose
//! interface name is malformed is skipped and reported in
//! [`ParseOutcome::skipped`], while output in which no well-formed block
//! header, usage section or table header is found at all fails with
//! [`ParseError`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::model::InterfaceRecord;

static INTERFACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z\-]*\d+(?:[/.:]\d+)*$").expect("static interface regex")
});

static CONFIG_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^interface\s+(\S+)\s*$").expect("static header regex"));

static STATUS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\S+)\s+is\s+(?:up|down|administratively|disabled|err-disabled|sfp|link)")
        .expect("static status regex")
});

static USAGE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^port-profile\s+(?:type\s+\S+\s+)?(?:name\s+)?(\S+)\s*$")
        .expect("static usage regex")
});

static INHERIT_PROFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:inherit\s+)?port-profile\s+(?:name\s+)?(\S+)\s*$")
        .expect("static inherit regex")
});

static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^description\s+(.+)$").expect("static description regex"));

static ACCESS_VLAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^switchport\s+access\s+vlan\s+(\S+)\s*$").expect("static vlan regex")
});

/// Records recovered from one device's output, plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Interface records in output order.
    pub records: Vec<InterfaceRecord>,

    /// Entries that were recognized as entries but could not be used.
    pub skipped: Vec<SkippedEntry>,
}

/// An entry the parser dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// 1-based line number in the raw output.
    pub line: usize,

    /// The offending line, trimmed.
    pub text: String,

    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The interface name does not look like an interface.
    InvalidInterfaceName,

    /// A line inside a usage section that is not a single interface name.
    UnexpectedMemberLine,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidInterfaceName => f.write_str("invalid interface name"),
            SkipReason::UnexpectedMemberLine => f.write_str("unexpected line in usage section"),
        }
    }
}

/// Which field a key or table column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Interface,
    Profile,
    Vlan,
    Description,
    Ignored,
}

/// Map a key or column title to a field, ignoring case, spaces, `-` and `_`.
fn field_for_key(key: &str) -> Field {
    let normalized: String = key
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect();

    match normalized.as_str() {
        "interface" | "intf" => Field::Interface,
        "portprofile" | "profile" => Field::Profile,
        "vlan" | "accessvlan" | "vlanid" => Field::Vlan,
        "description" | "desc" => Field::Description,
        _ => Field::Ignored,
    }
}

/// Cell or value placeholders that mean "not set".
fn present(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty()
        || value == "-"
        || value == "--"
        || value.eq_ignore_ascii_case("n/a")
    {
        None
    } else {
        Some(value.to_string())
    }
}

fn is_interface_name(name: &str) -> bool {
    INTERFACE_NAME.is_match(name)
}

fn is_separator(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| matches!(c, '-' | '=' | ' ' | '+'))
}

/// Parser state between lines. Every boundary replaces it wholesale.
enum Section {
    /// Nothing recognized yet, or a skipped block whose lines are ignored.
    Outside,

    /// Inside an interface block, collecting fields.
    Block(InterfaceRecord),

    /// Inside a `port-profile <name>` usage section.
    Usage(String),

    /// After a table header; holds the column layout.
    Table(Vec<Field>),
}

struct Parser {
    section: Section,
    recognized: bool,
    outcome: ParseOutcome,
}

impl Parser {
    fn new() -> Self {
        Self {
            section: Section::Outside,
            recognized: false,
            outcome: ParseOutcome::default(),
        }
    }

    /// Close the current section, emitting a pending interface block.
    fn flush(&mut self) {
        if let Section::Block(record) = std::mem::replace(&mut self.section, Section::Outside) {
            self.outcome.records.push(record);
        }
    }

    fn skip(&mut self, line: usize, text: &str, reason: SkipReason) {
        self.outcome.skipped.push(SkippedEntry {
            line,
            text: text.to_string(),
            reason,
        });
    }

    /// Start a new interface block, or skip it if the name is malformed.
    ///
    /// Only a well-formed name counts as recognized structure.
    fn open_block(&mut self, line: usize, text: &str, name: &str) {
        self.flush();
        if is_interface_name(name) {
            self.recognized = true;
            self.section = Section::Block(InterfaceRecord::new(name));
        } else {
            self.skip(line, text, SkipReason::InvalidInterfaceName);
        }
    }

    fn feed(&mut self, number: usize, raw: &str) {
        let indented = raw.starts_with([' ', '\t']);
        let line = raw.trim();
        if line.is_empty() || is_separator(line) {
            return;
        }

        if let Some(columns) = table_header(line) {
            self.flush();
            self.recognized = true;
            self.section = Section::Table(columns);
            return;
        }

        if !indented {
            if let Some(caps) = USAGE_HEADER.captures(line) {
                self.flush();
                self.recognized = true;
                self.section = Section::Usage(caps[1].to_string());
                return;
            }
            if let Some(caps) = CONFIG_HEADER.captures(line) {
                self.open_block(number, line, &caps[1]);
                return;
            }
            if let Some(caps) = STATUS_HEADER.captures(line) {
                self.open_block(number, line, &caps[1]);
                return;
            }
        }

        match &mut self.section {
            Section::Outside => {}
            Section::Block(record) => apply_block_line(record, line),
            Section::Usage(profile) => {
                let profile = profile.clone();
                self.usage_member(number, line, profile);
            }
            Section::Table(columns) => {
                let columns = columns.clone();
                self.table_row(number, line, &columns);
            }
        }
    }

    fn usage_member(&mut self, number: usize, line: &str, profile: String) {
        if line.split_whitespace().count() != 1 {
            self.skip(number, line, SkipReason::UnexpectedMemberLine);
        } else if is_interface_name(line) {
            self.outcome
                .records
                .push(InterfaceRecord::new(line).with_port_profile(profile));
        } else {
            self.skip(number, line, SkipReason::InvalidInterfaceName);
        }
    }

    fn table_row(&mut self, number: usize, line: &str, columns: &[Field]) {
        let cells = split_cells(line, columns.len());

        let mut record = InterfaceRecord::default();
        for (field, cell) in columns.iter().zip(cells.iter()) {
            match field {
                Field::Interface => record.interface = cell.trim().to_string(),
                Field::Profile => record.port_profile = present(cell),
                Field::Vlan => record.vlan = present(cell),
                Field::Description => record.description = present(cell),
                Field::Ignored => {}
            }
        }

        if is_interface_name(&record.interface) {
            self.outcome.records.push(record);
        } else {
            self.skip(number, line, SkipReason::InvalidInterfaceName);
        }
    }

    fn finish(mut self, text: &str) -> Result<ParseOutcome, ParseError> {
        self.flush();
        if self.recognized {
            Ok(self.outcome)
        } else {
            Err(ParseError::Unrecognized {
                preview: preview(text),
            })
        }
    }
}

/// Split a row into at most `count` cells on runs of whitespace, the final
/// cell keeping the remainder of the line.
fn split_cells(line: &str, count: usize) -> Vec<&str> {
    let mut cells = Vec::with_capacity(count);
    let mut rest = line.trim_start();
    while cells.len() + 1 < count {
        match rest.find(char::is_whitespace) {
            Some(end) => {
                cells.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        cells.push(rest);
    }
    cells
}

/// Recognize a table header: an interface column plus at least one known data
/// column.
fn table_header(line: &str) -> Option<Vec<Field>> {
    let columns: Vec<Field> = line.split_whitespace().map(field_for_key).collect();
    if columns.len() < 2 || columns.first() != Some(&Field::Interface) {
        return None;
    }
    let data_columns = columns
        .iter()
        .filter(|f| matches!(f, Field::Profile | Field::Vlan | Field::Description))
        .count();
    (data_columns > 0).then_some(columns)
}

/// Fill a block field from one of its lines. Unknown lines are ignored; the
/// first value seen for a field wins.
fn apply_block_line(record: &mut InterfaceRecord, line: &str) {
    let (field, value) = if let Some(caps) = INHERIT_PROFILE.captures(line) {
        (Field::Profile, caps[1].to_string())
    } else if let Some(caps) = DESCRIPTION.captures(line) {
        (Field::Description, caps[1].to_string())
    } else if let Some(caps) = ACCESS_VLAN.captures(line) {
        (Field::Vlan, caps[1].to_string())
    } else if let Some((key, value)) = split_key_value(line) {
        (field_for_key(key), value.to_string())
    } else {
        return;
    };

    let slot = match field {
        Field::Profile => &mut record.port_profile,
        Field::Vlan => &mut record.vlan,
        Field::Description => &mut record.description,
        Field::Interface | Field::Ignored => return,
    };
    if slot.is_none() {
        *slot = present(&value);
    }
}

/// Split `key: value` or `key = value` on whichever delimiter comes first.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let at = line.find([':', '='])?;
    let (key, value) = (line[..at].trim(), &line[at + 1..]);
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

fn preview(text: &str) -> String {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    first.chars().take(60).collect()
}

/// Parse one device's command output.
///
/// Deterministic and side-effect free: the same text always yields the same
/// records in the order their interfaces appear.
pub fn parse(text: &str) -> Result<ParseOutcome, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser::new();
    for (index, line) in text.lines().enumerate() {
        parser.feed(index + 1, line);
    }
    parser.finish(text)
}
