//! Line splitting over an incremental byte stream
//!
//! Chunks from the HTTP body do not respect record boundaries. The splitter
//! buffers the unterminated tail and yields only complete lines. A line longer
//! than the configured maximum is an error, so a peer that never sends `\n`
//! cannot grow the buffer without bound.

use crate::connector::ConnectorError;

/// Default line cap (1 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental `\n` splitter
#[derive(Debug)]
pub struct LineSplitter {
    pending: Vec<u8>,
    max_line_bytes: usize,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineSplitter {
    /// Create an empty splitter with the default line cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty splitter rejecting lines over `max_line_bytes`
    pub fn with_limit(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes: max_line_bytes.max(1),
        }
    }

    /// Feed a chunk, returning every line it completes.
    ///
    /// Terminators are removed, including a `\r` before the `\n`. Blank
    /// lines are returned as empty strings. Invalid UTF-8 is replaced.
    /// Fails with [`ConnectorError::Read`] once a line (terminated or not)
    /// exceeds the cap; the splitter is unusable afterwards.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, ConnectorError> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.check_len(pos)?;
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(Self::decode(&std::mem::take(&mut self.pending)));
            rest = &rest[pos + 1..];
        }
        self.check_len(rest.len())?;
        self.pending.extend_from_slice(rest);
        Ok(lines)
    }

    fn check_len(&self, extra: usize) -> Result<(), ConnectorError> {
        let len = self.pending.len() + extra;
        if len > self.max_line_bytes {
            return Err(ConnectorError::Read(format!(
                "line exceeds {} bytes without a terminator",
                self.max_line_bytes
            )));
        }
        Ok(())
    }

    /// Flush the unterminated tail at end of stream
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Self::decode(&std::mem::take(&mut self.pending)))
    }

    /// Bytes buffered without a terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn decode(bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}
