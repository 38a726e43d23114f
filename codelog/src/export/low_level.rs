//! `.ll` reader
//!
//! Decodes the layout shared through `codelog-common` on the machine that
//! wrote the file (native endianness and padding).

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

use codelog_common::{
    CodeCreateStruct, CodeMoveStruct, CODE_CREATE_STRUCT_SIZE, CODE_CREATE_TAG,
    CODE_MOVE_STRUCT_SIZE, CODE_MOVE_TAG, CODE_MOVING_GC_TAG,
};
use serde::{Serialize, Serializer};

use crate::domain::LowLevelParseError;

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LowLevelRecord {
    CodeCreate {
        #[serde(serialize_with = "hex_address")]
        address: u64,
        name: String,
        #[serde(serialize_with = "hex_bytes")]
        code: Vec<u8>,
    },
    CodeMove {
        #[serde(serialize_with = "hex_address")]
        from: u64,
        #[serde(serialize_with = "hex_address")]
        to: u64,
    },
    CodeMovingGc,
}

/// A whole decoded `.ll` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowLevelLog {
    pub arch: String,
    pub records: Vec<LowLevelRecord>,
}

impl LowLevelLog {
    /// Write the log as JSON.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write_json<W: Write>(&self, writer: W, pretty: bool) -> serde_json::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(writer, self)
        } else {
            serde_json::to_writer(writer, self)
        }
    }
}

fn hex_address<S: Serializer>(address: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{address:x}"))
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    serializer.serialize_str(&out)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, record: &'static str, offset: usize) -> Result<&'a [u8], LowLevelParseError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(LowLevelParseError::Truncated { record, offset });
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, record: &'static str, offset: usize) -> Result<[u8; N], LowLevelParseError> {
        let slice = self.take(N, record, offset)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }
}

fn length(field: &'static str, value: i32, offset: usize) -> Result<usize, LowLevelParseError> {
    usize::try_from(value).map_err(|_| LowLevelParseError::NegativeLength { field, value, offset })
}

/// Decode a complete `.ll` file image.
///
/// # Errors
/// Fails on a missing header, an unknown tag or a truncated record.
pub fn parse_low_level_log(bytes: &[u8]) -> Result<LowLevelLog, LowLevelParseError> {
    let header_end = bytes.iter().position(|b| *b == 0).ok_or(LowLevelParseError::MissingHeader)?;
    let arch = String::from_utf8_lossy(&bytes[..header_end]).into_owned();
    let mut cursor = Cursor { bytes, pos: header_end + 1 };
    let mut records = Vec::new();

    while cursor.pos < bytes.len() {
        let offset = cursor.pos;
        let tag = bytes[offset];
        cursor.pos += 1;
        let record = match tag {
            CODE_CREATE_TAG => {
                let header = CodeCreateStruct::from_ne_bytes(
                    &cursor.take_array::<CODE_CREATE_STRUCT_SIZE>("code-create", offset)?,
                );
                let name_len = length("name size", header.name_size, offset)?;
                let code_len = length("code size", header.code_size, offset)?;
                let name = cursor.take(name_len, "code-create", offset)?;
                let code = cursor.take(code_len, "code-create", offset)?;
                LowLevelRecord::CodeCreate {
                    address: header.code_address,
                    name: String::from_utf8_lossy(name).into_owned(),
                    code: code.to_vec(),
                }
            }
            CODE_MOVE_TAG => {
                let body = CodeMoveStruct::from_ne_bytes(
                    &cursor.take_array::<CODE_MOVE_STRUCT_SIZE>("code-move", offset)?,
                );
                LowLevelRecord::CodeMove { from: body.from_address, to: body.to_address }
            }
            CODE_MOVING_GC_TAG => LowLevelRecord::CodeMovingGc,
            tag => return Err(LowLevelParseError::UnknownTag { tag, offset }),
        };
        records.push(record);
    }

    Ok(LowLevelLog { arch, records })
}

/// Read and decode the `.ll` file at `path`.
///
/// # Errors
/// Fails if the file cannot be read or does not decode.
pub fn read_low_level_log(path: &Path) -> Result<LowLevelLog, LowLevelParseError> {
    let bytes = fs::read(path)?;
    parse_low_level_log(&bytes)
}
