//! Cisco NX-OS shell definition.
//!
//! Prompt patterns are adapted from scrapli's NX-OS driver.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                     # exec mode
//! switch#                     # privilege exec mode
//! switch(maint-mode)#         # maintenance mode
//! switch(config)#             # configuration mode
//! switch(config-if)#          # config sub-mode (interface)
//! ```

use memchr::{memchr, memrchr};
use regex::bytes::Regex;

/// Everything the session needs to know about the device shell.
#[derive(Debug, Clone)]
pub struct Platform {
    pub name: &'static str,

    /// Matches any prompt at the end of the output.
    pub prompt: Regex,

    /// Output substrings that mean the device rejected the command.
    pub failed_when_contains: Vec<&'static str>,

    /// Commands sent right after login.
    pub on_open_commands: Vec<&'static str>,
}

impl Platform {
    /// Strip the command echo from the front and the prompt line from the
    /// end of `raw`, and normalize line endings.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let text = raw.replace("\r\n", "\n").replace('\r', "");
        let mut body = text.as_str();

        if let Some(end) = memchr(b'\n', body.as_bytes()) {
            if body[..end].trim_end().ends_with(command.trim()) {
                body = &body[end + 1..];
            }
        }

        if let Some(m) = self.prompt.find(body.as_bytes()) {
            body = &body[..m.start()];
        } else if let Some(pos) = memrchr(b'\n', body.as_bytes()) {
            body = &body[..pos];
        }

        body.trim_end_matches('\n').to_string()
    }

    /// First failure marker present in `output`, if any.
    pub fn detect_failure(&self, output: &str) -> Option<&'static str> {
        self.failed_when_contains
            .iter()
            .copied()
            .find(|marker| output.contains(marker))
    }
}

/// Create the NX-OS platform definition.
///
/// Uses `(?m)` so `^` and `$` anchor at line boundaries.
pub fn nxos() -> Platform {
    let prompt = Regex::new(r"(?m)^[\w.\-@/:]{1,63}(?:\([\w.\-@/:+]{0,63}\))?[>#]\s?$")
        .expect("static NX-OS prompt regex");

    Platform {
        name: "cisco_nxos",
        prompt,
        failed_when_contains: vec![
            "% Ambiguous command",
            "% Incomplete command",
            "% Invalid input detected",
            "% Invalid command",
            "% Invalid parameter detected",
            "% Permission denied",
            "Syntax error while parsing",
        ],
        on_open_commands: vec!["terminal length 0", "terminal width 511"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nxos_platform() {
        let platform = nxos();
        assert_eq!(platform.name, "cisco_nxos");
        assert_eq!(platform.on_open_commands[0], "terminal length 0");
    }

    #[test]
    fn test_prompt_match() {
        let prompt = nxos().prompt;

        assert!(prompt.is_match(b"switch#"));
        assert!(prompt.is_match(b"switch# "));
        assert!(prompt.is_match(b"leaf-101.dc1>"));
        assert!(prompt.is_match(b"switch(config-if)#"));
        assert!(prompt.is_match(b"switch(maint-mode)#"));
        assert!(prompt.is_match(b"some output\nswitch#"));

        assert!(!prompt.is_match(b"switch# show version"));
        assert!(!prompt.is_match(b"Password:"));
    }

    #[test]
    fn test_normalize_output() {
        let platform = nxos();
        let raw = "show port-profile usage\r\nport-profile A\r\n Ethernet1/1\r\nleaf1# ";
        assert_eq!(
            platform.normalize_output(raw, "show port-profile usage"),
            "port-profile A\n Ethernet1/1"
        );
    }

    #[test]
    fn test_normalize_output_with_prompt_echo() {
        let platform = nxos();
        let raw = "leaf1# show port-profile usage\nport-profile A\n Ethernet1/1\nleaf1#";
        assert_eq!(
            platform.normalize_output(raw, "show port-profile usage"),
            "port-profile A\n Ethernet1/1"
        );
    }

    #[test]
    fn test_detect_failure() {
        let platform = nxos();
        assert_eq!(
            platform.detect_failure("                ^\n% Invalid command at '^' marker."),
            Some("% Invalid command")
        );
        assert_eq!(platform.detect_failure("port-profile A\n Ethernet1/1"), None);
    }
}
