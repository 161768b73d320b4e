//! Splits raw stdin chunks into complete key sequences.
//!
//! A lone ESC (or any unterminated escape sequence) is held until more bytes
//! arrive or the escape timeout elapses, then emitted verbatim.

use std::time::{Duration, Instant};

const ESC: u8 = 0x1b;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceStatus {
    Complete,
    Incomplete,
}

#[derive(Debug)]
pub struct SequenceBuffer {
    buffer: String,
    timeout: Duration,
    flush_deadline: Option<Instant>,
}

impl SequenceBuffer {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            buffer: String::new(),
            timeout: Duration::from_millis(timeout_ms),
            flush_deadline: None,
        }
    }

    /// Feed a chunk read from stdin; returns every sequence it completes, in order.
    pub fn process(&mut self, data: &[u8]) -> Vec<String> {
        self.flush_deadline = None;

        // Meta-sent-as-high-bit: a single byte > 127 means ESC + (byte - 128).
        if data.len() == 1 && data[0] > 127 {
            self.buffer.push(ESC as char);
            self.buffer.push((data[0] - 128) as char);
        } else {
            self.buffer.push_str(&String::from_utf8_lossy(data));
        }

        let (sequences, remainder) = split_sequences(&self.buffer);
        self.buffer = remainder;
        if !self.buffer.is_empty() {
            self.flush_deadline = Some(Instant::now() + self.timeout);
        }
        sequences
    }

    /// Emit the held tail once its deadline has passed.
    pub fn flush_due(&mut self, now: Instant) -> Vec<String> {
        match self.flush_deadline {
            Some(deadline) if now >= deadline => self.flush(),
            None if !self.buffer.is_empty() => self.flush(),
            _ => Vec::new(),
        }
    }

    /// Poll timeout: time left until the pending flush, capped at `default_ms`.
    pub fn next_timeout_ms(&self, now: Instant, default_ms: i32) -> i32 {
        if let Some(deadline) = self.flush_deadline {
            let remaining = deadline.saturating_duration_since(now);
            let ms = remaining.as_millis().min(i32::MAX as u128) as i32;
            return ms.min(default_ms).max(0);
        }
        default_ms
    }

    pub fn flush(&mut self) -> Vec<String> {
        self.flush_deadline = None;
        if self.buffer.is_empty() {
            return Vec::new();
        }
        vec![std::mem::take(&mut self.buffer)]
    }
}

fn split_sequences(buffer: &str) -> (Vec<String>, String) {
    let mut sequences = Vec::new();
    let mut pos = 0;
    let bytes = buffer.as_bytes();

    while pos < bytes.len() {
        if bytes[pos] != ESC {
            let Some(ch) = buffer[pos..].chars().next() else {
                break;
            };
            sequences.push(ch.to_string());
            pos += ch.len_utf8();
            continue;
        }

        let mut end = pos + 1;
        loop {
            if end > bytes.len() {
                return (sequences, buffer[pos..].to_string());
            }
            if !buffer.is_char_boundary(end) {
                end += 1;
                continue;
            }
            match sequence_status(&buffer[pos..end]) {
                SequenceStatus::Complete => {
                    sequences.push(buffer[pos..end].to_string());
                    pos = end;
                    break;
                }
                SequenceStatus::Incomplete => end += 1,
            }
        }
    }

    (sequences, String::new())
}

fn sequence_status(data: &str) -> SequenceStatus {
    let bytes = data.as_bytes();
    if bytes.len() == 1 {
        return SequenceStatus::Incomplete;
    }

    match bytes[1] {
        b'[' => csi_status(bytes),
        b'O' => {
            if bytes.len() >= 3 {
                SequenceStatus::Complete
            } else {
                SequenceStatus::Incomplete
            }
        }
        _ => SequenceStatus::Complete,
    }
}

fn csi_status(bytes: &[u8]) -> SequenceStatus {
    if bytes.len() < 3 {
        return SequenceStatus::Incomplete;
    }
    let payload = &bytes[2..];
    // `CSI [ A`: linux console function keys carry one extra byte.
    if payload[0] == b'[' {
        return if payload.len() >= 2 {
            SequenceStatus::Complete
        } else {
            SequenceStatus::Incomplete
        };
    }
    match payload.last() {
        Some(last) if (0x40..=0x7e).contains(last) => SequenceStatus::Complete,
        _ => SequenceStatus::Incomplete,
    }
}
