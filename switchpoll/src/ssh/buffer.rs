//! Output buffer with tail-only prompt search.
//!
//! Prompts only ever appear at the end of the output, so only the last
//! `search_depth` bytes are searched. Terminal escape sequences are stripped
//! on the way in, including sequences split across reads.

use regex::bytes::Regex;

/// Collects printable output for [`vte::Parser`].
struct Printable<'a> {
    out: &'a mut Vec<u8>,
}

impl vte::Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte);
        }
    }
}

/// Buffer for accumulating shell output and matching the prompt.
pub struct PatternBuffer {
    buffer: Vec<u8>,
    search_depth: usize,
    parser: vte::Parser,
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: vte::Parser::new(),
        }
    }

    /// Append raw channel data, dropping ANSI escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut printable, data);
    }

    /// Whether the prompt pattern matches within the tail of the buffer.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.is_match(&self.buffer[start..])
    }

    /// Take the contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
