//! Newline framing of the inbound byte stream.

/// Splits an arbitrary chunked byte stream into lines.
///
/// Accepts `\n` and `\r\n` terminators, drops blank lines and decodes
/// lossily so a corrupted byte cannot stall the stream.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

/// Upper bound for a single unterminated line before it is force-flushed
const MAX_PENDING: usize = 4096;

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                self.flush_into(&mut lines);
            } else {
                self.buffer.push(byte);
                if self.buffer.len() >= MAX_PENDING {
                    tracing::warn!("Discarding {} bytes without a line terminator", self.buffer.len());
                    self.buffer.clear();
                }
            }
        }
        lines
    }

    /// Bytes received after the last terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn flush_into(&mut self, lines: &mut Vec<String>) {
        let text = String::from_utf8_lossy(&self.buffer);
        let text = text.trim_end_matches('\r').trim();
        if !text.is_empty() {
            lines.push(text.to_string());
        }
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"<Idle|MPos:0").is_empty());
        assert_eq!(framer.pending(), 12);

        let lines = framer.push(b",0,0>\r\nok\n");
        assert_eq!(lines, vec!["<Idle|MPos:0,0,0>", "ok"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"\r\n\n  \nok\n"), vec!["ok"]);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"[MSG:\xff]\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[MSG:"));
    }

    #[test]
    fn test_runaway_line_is_discarded() {
        let mut framer = LineFramer::new();
        framer.push(&vec![b'x'; MAX_PENDING + 10]);
        assert!(framer.pending() < MAX_PENDING);
        assert_eq!(framer.push(b"\nok\n").last().map(String::as_str), Some("ok"));
    }
}
