//! Bounded name formatter
//!
//! Every code-creation event renders a human-readable name such as
//! `JS:*compute app.js:12:3` before handing it to an encoder. That happens
//! inside compilation paths, so the buffer has a fixed capacity, never
//! allocates, and truncates silently instead of overflowing.

use std::io::{Cursor, Write};

use crate::domain::{CodeTag, Name};

/// Capacity of a [`NameBuffer`] in bytes.
pub const NAME_BUFFER_CAPACITY: usize = 4096;

/// Fixed-capacity append-only byte accumulator.
///
/// Every append returns the number of bytes actually written; `len()` never
/// exceeds [`NAME_BUFFER_CAPACITY`]. Integers are written whole or not at all.
pub struct NameBuffer {
    pos: usize,
    buf: [u8; NAME_BUFFER_CAPACITY],
}

impl Default for NameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl NameBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self { pos: 0, buf: [0; NAME_BUFFER_CAPACITY] }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Reset and write the `<tag>:` prefix.
    pub fn init(&mut self, tag: CodeTag) {
        self.reset();
        self.append_str(tag.log_name());
        self.append_byte(b':');
    }

    /// Append a string name, or the `symbol("<description>" hash <hex>)`
    /// rendering of a symbol.
    pub fn append_name(&mut self, name: &Name<'_>) -> usize {
        match name {
            Name::String(s) => self.append_str(s),
            Name::Symbol { description, hash } => {
                let mut written = self.append_str("symbol(");
                if let Some(description) = description {
                    written += self.append_byte(b'"');
                    written += self.append_str(description);
                    written += self.append_str("\" ");
                }
                written += self.append_str("hash ");
                written += self.append_hex(*hash);
                written + self.append_byte(b')')
            }
        }
    }

    pub fn append_str(&mut self, s: &str) -> usize {
        self.append_bytes(s.as_bytes())
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> usize {
        let size = bytes.len().min(self.remaining());
        self.buf[self.pos..self.pos + size].copy_from_slice(&bytes[..size]);
        self.pos += size;
        size
    }

    pub fn append_byte(&mut self, byte: u8) -> usize {
        if self.pos >= NAME_BUFFER_CAPACITY {
            return 0;
        }
        self.buf[self.pos] = byte;
        self.pos += 1;
        1
    }

    pub fn append_int(&mut self, n: i64) -> usize {
        let mut scratch = [0u8; 24];
        let mut cursor = Cursor::new(&mut scratch[..]);
        if write!(cursor, "{n}").is_err() {
            return 0;
        }
        let len = cursor_len(&cursor);
        self.append_whole(&scratch, len)
    }

    pub fn append_hex(&mut self, n: u32) -> usize {
        let mut scratch = [0u8; 8];
        let mut cursor = Cursor::new(&mut scratch[..]);
        if write!(cursor, "{n:x}").is_err() {
            return 0;
        }
        let len = cursor_len(&cursor);
        self.append_whole(&scratch, len)
    }

    fn append_whole(&mut self, scratch: &[u8], len: usize) -> usize {
        if len > self.remaining() {
            return 0;
        }
        self.append_bytes(&scratch[..len])
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        NAME_BUFFER_CAPACITY - self.pos
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cursor_len(cursor: &Cursor<&mut [u8]>) -> usize {
    cursor.position() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_tag_prefix() {
        let mut buffer = NameBuffer::new();
        buffer.init(CodeTag::Function);
        assert_eq!(buffer.as_bytes(), b"JS:");
        buffer.append_str("stale");
        buffer.init(CodeTag::RegExp);
        assert_eq!(buffer.as_bytes(), b"RegExp:");
    }

    #[test]
    fn test_symbol_rendering() {
        let mut buffer = NameBuffer::new();
        buffer.append_name(&Name::Symbol { description: Some("Symbol.iterator"), hash: 0x2a });
        assert_eq!(buffer.as_bytes(), b"symbol(\"Symbol.iterator\" hash 2a)");

        buffer.reset();
        buffer.append_name(&Name::Symbol { description: None, hash: 0xff });
        assert_eq!(buffer.as_bytes(), b"symbol(hash ff)");
    }

    #[test]
    fn test_numbers() {
        let mut buffer = NameBuffer::new();
        assert_eq!(buffer.append_int(-42), 3);
        buffer.append_byte(b':');
        assert_eq!(buffer.append_hex(0xdead_beef), 8);
        assert_eq!(buffer.as_bytes(), b"-42:deadbeef");
    }

    #[test]
    fn test_oversized_append_truncates_at_capacity() {
        let mut buffer = NameBuffer::new();
        buffer.init(CodeTag::Stub);
        let huge = "x".repeat(10_000);
        let written = buffer.append_str(&huge);
        assert_eq!(written, NAME_BUFFER_CAPACITY - "Stub:".len());
        assert_eq!(buffer.len(), NAME_BUFFER_CAPACITY);
        assert_eq!(buffer.append_byte(b'!'), 0);
        assert_eq!(buffer.append_str("more"), 0);
        assert_eq!(buffer.len(), NAME_BUFFER_CAPACITY);
    }

    #[test]
    fn test_int_is_all_or_nothing() {
        let mut buffer = NameBuffer::new();
        buffer.append_bytes(&vec![b'a'; NAME_BUFFER_CAPACITY - 2]);
        assert_eq!(buffer.append_int(12_345), 0);
        assert_eq!(buffer.append_int(12), 2);
        assert_eq!(buffer.len(), NAME_BUFFER_CAPACITY);
        assert_eq!(buffer.append_hex(1), 0);
    }

    #[test]
    fn test_many_small_appends_never_exceed_capacity() {
        let mut buffer = NameBuffer::new();
        for i in 0..5_000 {
            buffer.append_int(i);
            buffer.append_byte(b',');
            buffer.append_name(&Name::Symbol { description: Some("d"), hash: 7 });
            assert!(buffer.len() <= NAME_BUFFER_CAPACITY);
        }
        assert!(buffer.remaining() < 32);
    }
}
