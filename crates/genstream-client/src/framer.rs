//! Splits a chunked SSE byte stream into frames.
//!
//! Bytes are buffered until a blank line closes a frame, so multi-byte UTF-8
//! sequences and delimiters split across network chunks are reassembled
//! before any text decoding happens.

/// One complete SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` line, if any.
    pub event: Option<String>,
    /// Joined `data:` lines. Frames without a `data:` line are never emitted.
    pub data: String,
}

/// Incremental frame splitter. One instance per session.
#[derive(Debug, Default)]
pub struct SseFramer {
    buf: Vec<u8>,
}

impl SseFramer {
    /// Appends `chunk` and returns every frame it completes, in wire order.
    ///
    /// Any trailing partial frame stays buffered for the next call.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut start = 0;
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf[start..]) {
            if let Some(frame) = parse_frame(&self.buf[start..start + idx]) {
                frames.push(frame);
            }
            start += idx + delim_len;
        }
        self.buf.drain(..start);
        frames
    }

    /// Number of bytes waiting for a frame delimiter.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drops the unterminated tail, returning how many bytes were discarded.
    pub fn discard_pending(&mut self) -> usize {
        let len = self.buf.len();
        self.buf.clear();
        len
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_frame(bytes: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches(['\r', '\n']);
    if text.is_empty() || text.starts_with(':') {
        return None;
    }

    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event: event.filter(|name| !name.is_empty()),
        data: data_lines.join("\n"),
    })
}
