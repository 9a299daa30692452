//! Line framing for `text/event-stream` bodies
//!
//! Bytes arrive in arbitrary chunks. Complete lines are cut on `\n` at the
//! byte level, so a multi-byte character split across two reads is only
//! decoded once both halves are buffered. Only `data: ` lines carry payload;
//! `event:`, `id:`, comments, and blank record separators are skipped.

const DATA_PREFIX: &str = "data: ";

/// Incremental decoder turning raw body chunks into frame payloads
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the payloads of every line it completed,
    /// in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        // Everything after the last newline stays buffered for the next read
        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete
            .split(|&b| b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// End of stream. An unterminated trailing line is never delivered.
    pub fn finish(self) -> usize {
        if !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "Discarding unterminated trailing line"
            );
        }
        self.buffer.len()
    }
}

fn decode_line(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = String::from_utf8_lossy(line);
    text.strip_prefix(DATA_PREFIX).map(str::to_string)
}
