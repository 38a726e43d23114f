//! # Shared Low-Level Log Layout (writer ↔ offline readers)
//!
//! Defines the binary record layout of the `.ll` low-level code log. The
//! writer lives in `codelog::listeners::low_level`; offline post-processing
//! tools (and `codelog::export::low_level`) decode the same bytes with the
//! helpers here, so both sides agree on one definition.
//!
//! ## File Layout
//!
//! ```text
//! <arch name>\0                      architecture tag, NUL-terminated
//! 'C' CodeCreateStruct name code     code creation
//! 'M' CodeMoveStruct                 code relocation
//! 'G'                                code-moving GC notification
//! ```
//!
//! Records are written as the raw bytes of `#[repr(C)]` structs, in native
//! endianness and with native padding. The format is meant for tools running
//! on the same machine, not for portability.

#![no_std]

use core::mem::{offset_of, size_of};

// ============================================================================
// Record Tags
// ============================================================================

/// Code creation record: `CodeCreateStruct`, then the name bytes, then the
/// instruction bytes.
pub const CODE_CREATE_TAG: u8 = b'C';

/// Code relocation record: `CodeMoveStruct`.
pub const CODE_MOVE_TAG: u8 = b'M';

/// Code-moving GC notification: the tag byte alone.
pub const CODE_MOVING_GC_TAG: u8 = b'G';

/// Extension appended to the text log name to get the low-level log name.
pub const LOW_LEVEL_LOG_EXTENSION: &str = ".ll";

/// Size in bytes of an encoded [`CodeCreateStruct`] (tag byte excluded).
pub const CODE_CREATE_STRUCT_SIZE: usize = size_of::<CodeCreateStruct>();

/// Size in bytes of an encoded [`CodeMoveStruct`] (tag byte excluded).
pub const CODE_MOVE_STRUCT_SIZE: usize = size_of::<CodeMoveStruct>();

// ============================================================================
// Record Structures
// ============================================================================

/// Header of a code creation record.
///
/// **Memory Layout**: `#[repr(C)]`, so on 64-bit targets there are 4 padding
/// bytes after `name_size` and after `code_size` (24 bytes total).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeCreateStruct {
    /// Length of the name that follows the header, in bytes
    pub name_size: i32,

    /// Start address of the instructions
    pub code_address: u64,

    /// Number of instruction bytes that follow the name
    pub code_size: i32,
}

/// Body of a code relocation record.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeMoveStruct {
    /// Instruction start before the move
    pub from_address: u64,

    /// Instruction start after the move
    pub to_address: u64,
}

impl CodeCreateStruct {
    /// Encode into the native in-memory representation (padding zeroed).
    #[must_use]
    pub fn to_ne_bytes(&self) -> [u8; CODE_CREATE_STRUCT_SIZE] {
        let mut out = [0u8; CODE_CREATE_STRUCT_SIZE];
        put(&mut out, offset_of!(Self, name_size), &self.name_size.to_ne_bytes());
        put(&mut out, offset_of!(Self, code_address), &self.code_address.to_ne_bytes());
        put(&mut out, offset_of!(Self, code_size), &self.code_size.to_ne_bytes());
        out
    }

    /// Decode from the native in-memory representation.
    #[must_use]
    pub fn from_ne_bytes(bytes: &[u8; CODE_CREATE_STRUCT_SIZE]) -> Self {
        Self {
            name_size: i32::from_ne_bytes(take(bytes, offset_of!(Self, name_size))),
            code_address: u64::from_ne_bytes(take(bytes, offset_of!(Self, code_address))),
            code_size: i32::from_ne_bytes(take(bytes, offset_of!(Self, code_size))),
        }
    }
}

impl CodeMoveStruct {
    /// Encode into the native in-memory representation.
    #[must_use]
    pub fn to_ne_bytes(&self) -> [u8; CODE_MOVE_STRUCT_SIZE] {
        let mut out = [0u8; CODE_MOVE_STRUCT_SIZE];
        put(&mut out, offset_of!(Self, from_address), &self.from_address.to_ne_bytes());
        put(&mut out, offset_of!(Self, to_address), &self.to_address.to_ne_bytes());
        out
    }

    /// Decode from the native in-memory representation.
    #[must_use]
    pub fn from_ne_bytes(bytes: &[u8; CODE_MOVE_STRUCT_SIZE]) -> Self {
        Self {
            from_address: u64::from_ne_bytes(take(bytes, offset_of!(Self, from_address))),
            to_address: u64::from_ne_bytes(take(bytes, offset_of!(Self, to_address))),
        }
    }
}

fn put(out: &mut [u8], offset: usize, bytes: &[u8]) {
    out[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn take<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut field = [0u8; N];
    field.copy_from_slice(&bytes[offset..offset + N]);
    field
}

// ============================================================================
// Architecture Tag
// ============================================================================

/// Architecture name written (NUL-terminated) at the start of every `.ll` file.
///
/// Offline tools use it to pick a disassembler for the embedded code bytes.
#[must_use]
pub const fn target_arch_name() -> &'static str {
    if cfg!(target_arch = "x86") {
        "ia32"
    } else if cfg!(target_arch = "x86_64") {
        "x64"
    } else if cfg!(target_arch = "arm") {
        "arm"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "powerpc") {
        "ppc"
    } else if cfg!(target_arch = "powerpc64") {
        "ppc64"
    } else if cfg!(target_arch = "mips") {
        "mips"
    } else if cfg!(target_arch = "loongarch64") {
        "loong64"
    } else if cfg!(target_arch = "s390x") {
        "s390"
    } else if cfg!(target_arch = "riscv64") {
        "riscv64"
    } else if cfg!(target_arch = "riscv32") {
        "riscv32"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes_follow_repr_c() {
        assert_eq!(CODE_MOVE_STRUCT_SIZE, 16);
        if cfg!(target_pointer_width = "64") {
            assert_eq!(CODE_CREATE_STRUCT_SIZE, 24);
            assert_eq!(offset_of!(CodeCreateStruct, code_address), 8);
        }
    }

    #[test]
    fn test_code_create_decode_matches_encode() {
        let event = CodeCreateStruct { name_size: 3, code_address: 0x1000, code_size: 64 };
        assert_eq!(CodeCreateStruct::from_ne_bytes(&event.to_ne_bytes()), event);
    }

    #[test]
    fn test_padding_is_zeroed() {
        let event = CodeCreateStruct { name_size: -1, code_address: u64::MAX, code_size: -1 };
        let bytes = event.to_ne_bytes();
        let pad_start = offset_of!(CodeCreateStruct, name_size) + 4;
        let pad_end = offset_of!(CodeCreateStruct, code_address);
        assert!(bytes[pad_start..pad_end].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_arch_name_is_known_on_common_targets() {
        if cfg!(target_arch = "x86_64") {
            assert_eq!(target_arch_name(), "x64");
        }
        assert!(!target_arch_name().is_empty());
    }
}
