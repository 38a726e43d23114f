//! Record assembly for the text log
//!
//! A record is `<event>,<field>,<field>...\n`. Numbers and pointers are
//! written raw. String fields go through [`escape_into`]: the separator,
//! the backslash and non-printable characters are escaped, so a field can
//! never split into two. Name-bearing fields are additionally capped at
//! [`MAX_NAME_FIELD_LEN`] escaped bytes.

use std::fmt::{self, Write as _};
use std::io::Write;
use std::sync::MutexGuard;

use log::warn;

use super::Destination;
use crate::domain::Address;
use crate::listeners::name_buffer::NAME_BUFFER_CAPACITY;

/// Field separator of the text log.
pub const SEPARATOR: u8 = b',';

/// Longest escaped rendering of a name, comment or source field.
pub const MAX_NAME_FIELD_LEN: usize = NAME_BUFFER_CAPACITY;

/// Builder for one record. Holds the destination lock until it is written
/// or dropped; dropping without writing discards the record.
pub struct MessageBuilder<'a> {
    destination: MutexGuard<'a, Destination>,
}

impl<'a> MessageBuilder<'a> {
    pub(super) fn new(mut destination: MutexGuard<'a, Destination>) -> Self {
        destination.scratch.clear();
        Self { destination }
    }

    fn buf(&mut self) -> &mut Vec<u8> {
        &mut self.destination.scratch
    }

    /// Append text that is known not to need escaping (event names,
    /// reserved words).
    pub fn append_raw(&mut self, s: &str) -> &mut Self {
        self.buf().extend_from_slice(s.as_bytes());
        self
    }

    /// Append a string field, escaped.
    pub fn append_str(&mut self, s: &str) -> &mut Self {
        escape_into(self.buf(), s);
        self
    }

    /// Append possibly non-UTF-8 bytes as an escaped string field.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let text = String::from_utf8_lossy(bytes);
        escape_into(self.buf(), &text);
        self
    }

    /// Append a string field, escaped and cut at [`MAX_NAME_FIELD_LEN`]
    /// bytes. An escape sequence is never split.
    pub fn append_bounded_str(&mut self, s: &str) -> &mut Self {
        escape_into_bounded(self.buf(), s, MAX_NAME_FIELD_LEN);
        self
    }

    /// [`Self::append_bounded_str`] for possibly non-UTF-8 bytes, such as
    /// the contents of a name buffer.
    pub fn append_bounded_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let text = String::from_utf8_lossy(bytes);
        escape_into_bounded(self.buf(), &text, MAX_NAME_FIELD_LEN);
        self
    }

    /// Append a number or any other value whose rendering never contains
    /// the separator.
    pub fn append_value<T: fmt::Display>(&mut self, value: T) -> &mut Self {
        let mut writer = ByteWriter(self.buf());
        // Writing into a Vec cannot fail.
        let _ = write!(writer, "{value}");
        self
    }

    /// Append a pointer as `0x<lowercase hex>`.
    pub fn append_address(&mut self, address: Address) -> &mut Self {
        self.append_value(address)
    }

    pub fn separator(&mut self) -> &mut Self {
        self.buf().push(SEPARATOR);
        self
    }

    /// Terminate the record with a newline and write it out.
    ///
    /// A failed write drops this record only.
    pub fn write_to_log_file(mut self) {
        let destination = &mut *self.destination;
        destination.scratch.push(b'\n');
        if let Some(output) = destination.output.as_mut() {
            if let Err(e) = output.write_all(&destination.scratch) {
                warn!("Dropped text log record: {e}");
            }
        }
    }
}

struct ByteWriter<'b>(&'b mut Vec<u8>);

impl fmt::Write for ByteWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Escape a string field.
///
/// `,` becomes `\x2C`, `\` becomes `\\`, newline becomes `\n`, other bytes
/// outside printable ASCII become `\xNN` (up to 0xff) or `\uNNNN` (UTF-16
/// code units above that).
pub fn escape_into(out: &mut Vec<u8>, s: &str) {
    let mut writer = ByteWriter(out);
    for c in s.chars() {
        escape_char(&mut writer, c);
    }
}

/// Escape a string field, stopping before the escaped output would exceed
/// `limit` bytes.
pub fn escape_into_bounded(out: &mut Vec<u8>, s: &str, limit: usize) {
    let start = out.len();
    for c in s.chars() {
        let mark = out.len();
        escape_char(&mut ByteWriter(out), c);
        if out.len() - start > limit {
            out.truncate(mark);
            return;
        }
    }
}

fn escape_char(writer: &mut ByteWriter<'_>, c: char) {
    // Writing into a Vec cannot fail.
    let _ = match c {
        ',' => writer.write_str("\\x2C"),
        '\\' => writer.write_str("\\\\"),
        '\n' => writer.write_str("\\n"),
        ' '..='~' => writer.write_char(c),
        _ if u32::from(c) <= 0xff => write!(writer, "\\x{:02x}", u32::from(c)),
        _ => {
            let mut units = [0u16; 2];
            c.encode_utf16(&mut units)
                .iter()
                .try_for_each(|unit| write!(writer, "\\u{unit:04x}"))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_log;

    fn escaped(s: &str) -> String {
        let mut out = Vec::new();
        escape_into(&mut out, s);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_escape_separator_and_backslash() {
        assert_eq!(escaped("a,b"), "a\\x2Cb");
        assert_eq!(escaped("c:\\dir"), "c:\\\\dir");
        assert_eq!(escaped("line\nnext"), "line\\nnext");
    }

    #[test]
    fn test_escape_non_printables() {
        assert_eq!(escaped("\t"), "\\x09");
        assert_eq!(escaped("é"), "\\xe9");
        assert_eq!(escaped("€"), "\\u20ac");
        assert_eq!(escaped("😀"), "\\ud83d\\ude00");
    }

    #[test]
    fn test_bounded_escape_stops_at_limit() {
        let mut out = b"prefix,".to_vec();
        escape_into_bounded(&mut out, &"y".repeat(100), 10);
        assert_eq!(out, b"prefix,yyyyyyyyyy");

        // The comma would need four bytes but only two remain.
        let mut out = Vec::new();
        escape_into_bounded(&mut out, "abcdefgh,ij", 10);
        assert_eq!(out, b"abcdefgh");

        let mut out = Vec::new();
        escape_into_bounded(&mut out, "short", 10);
        assert_eq!(out, b"short");
    }

    #[test]
    fn test_bounded_field_in_record() {
        let (log, sink) = memory_log();
        let long = "z".repeat(MAX_NAME_FIELD_LEN * 3);
        let mut msg = log.new_message_builder().unwrap();
        msg.append_raw("code-creation").separator().append_bounded_str(&long);
        msg.write_to_log_file();

        let contents = sink.contents();
        assert_eq!(contents.len(), "code-creation,".len() + MAX_NAME_FIELD_LEN + 1);
        assert!(contents.ends_with("zz\n"));
    }

    #[test]
    fn test_plain_ascii_untouched() {
        assert_eq!(escaped("foo bar:12:3"), "foo bar:12:3");
    }

    #[test]
    fn test_record_layout() {
        let (log, sink) = memory_log();
        let mut msg = log.new_message_builder().unwrap();
        msg.append_raw("code-move")
            .separator()
            .append_address(Address(0x1000))
            .separator()
            .append_value(-2)
            .separator()
            .append_str("x,y");
        msg.write_to_log_file();

        assert_eq!(sink.contents(), "code-move,0x1000,-2,x\\x2Cy\n");
    }

    #[test]
    fn test_dropped_builder_writes_nothing() {
        let (log, sink) = memory_log();
        {
            let mut msg = log.new_message_builder().unwrap();
            msg.append_raw("partial");
        }
        let mut msg = log.new_message_builder().unwrap();
        msg.append_raw("whole");
        msg.write_to_log_file();
        assert_eq!(sink.contents(), "whole\n");
    }
}
